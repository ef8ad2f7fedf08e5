//! Periodic reconciliation of buffered visits into the durable store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::VisitBuffer;

/// Outcome of one flush cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Codes whose delta was merged into the durable store.
    pub flushed: usize,
    /// Codes whose delta could not be merged and was returned to the buffer.
    pub failed: usize,
}

/// Reconciler that drains the visit buffer into the durable store.
///
/// The unit of work per code is an atomic pop: the buffered delta is read and
/// cleared in one step, so visits recorded while the flush is running start a
/// fresh buffer entry instead of being read-then-lost. A delta whose durable
/// merge fails is re-merged into the buffer and retried on the next cycle,
/// giving at-least-once delivery of every recorded visit.
pub struct FlushService<R: UrlRepository> {
    repository: Arc<R>,
    buffer: Arc<dyn VisitBuffer>,
}

impl<R: UrlRepository> FlushService<R> {
    /// Creates a new flush service.
    pub fn new(repository: Arc<R>, buffer: Arc<dyn VisitBuffer>) -> Self {
        Self { repository, buffer }
    }

    /// Merges every outstanding buffered delta into the durable store.
    ///
    /// Idempotent and safe to invoke redundantly: with nothing buffered it is
    /// a no-op. Per-code failures are contained and counted in the report,
    /// never propagated.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] only when the buffer cannot be
    /// enumerated at all.
    pub async fn flush(&self) -> Result<FlushReport, AppError> {
        let codes = self.buffer.pending_codes().await.map_err(|e| {
            AppError::internal(
                "Failed to enumerate visit buffer",
                json!({ "reason": e.to_string() }),
            )
        })?;

        let mut report = FlushReport::default();

        for code in codes {
            let delta = match self.buffer.pop(&code).await {
                Ok(Some(delta)) => delta,
                // Another flush owner consumed it first; nothing to do.
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to pop visit delta for {}: {}", code, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self
                .repository
                .apply_visit_delta(&code, delta.count, delta.last_visited_at)
                .await
            {
                Ok(()) => {
                    metrics::counter!("visits_flushed_total").increment(delta.count as u64);
                    report.flushed += 1;
                }
                Err(e) => {
                    warn!(
                        "Durable merge failed for {} (count: {}), returning delta to buffer: {}",
                        code, delta.count, e
                    );
                    if let Err(merge_err) = self.buffer.merge(&code, delta).await {
                        // Both stores are failing; the delta is lost.
                        error!(
                            "Could not return visit delta for {} to buffer: {}",
                            code, merge_err
                        );
                    }
                    metrics::counter!("flush_failures_total").increment(1);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Runs the flush on a fixed schedule until the process exits.
    ///
    /// Each cycle is awaited before the next tick is taken, so runs never
    /// overlap within a process. Concurrent flush owners in other processes
    /// are safe because the pop is atomic, just wasteful.
    pub async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a restart loop does
        // not hammer the durable store.
        ticker.tick().await;

        info!("Flush job scheduled every {:?}", period);

        loop {
            ticker.tick().await;

            match self.flush().await {
                Ok(report) if report.flushed > 0 || report.failed > 0 => {
                    info!(
                        "Flushed visit counts: {} merged, {} returned for retry",
                        report.flushed, report.failed
                    );
                }
                Ok(_) => debug!("Flush cycle: nothing buffered"),
                Err(e) => error!("Flush cycle failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUrlRepository;
    use crate::infrastructure::cache::{MemoryStore, VisitBuffer, VisitDelta};
    use chrono::Utc;
    use mockall::Sequence;

    fn build(
        repo: MockUrlRepository,
    ) -> (FlushService<MockUrlRepository>, Arc<MemoryStore>) {
        let buffer = Arc::new(MemoryStore::new());
        let service = FlushService::new(Arc::new(repo), buffer.clone());
        (service, buffer)
    }

    #[tokio::test]
    async fn test_flush_merges_buffered_delta_and_clears_buffer() {
        let mut mock_repo = MockUrlRepository::new();
        mock_repo
            .expect_apply_visit_delta()
            .withf(|code, count, visited| code == "abc123" && *count == 3 && visited.is_some())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (service, buffer) = build(mock_repo);

        for _ in 0..3 {
            buffer.record("abc123", Utc::now()).await.unwrap();
        }

        let report = service.flush().await.unwrap();

        assert_eq!(report, FlushReport { flushed: 1, failed: 0 });
        assert!(buffer.peek("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_with_empty_buffer_is_a_noop() {
        let mut mock_repo = MockUrlRepository::new();
        mock_repo.expect_apply_visit_delta().times(0);

        let (service, _buffer) = build(mock_repo);

        let report = service.flush().await.unwrap();
        assert_eq!(report, FlushReport::default());
    }

    #[tokio::test]
    async fn test_flush_is_idempotent() {
        let mut mock_repo = MockUrlRepository::new();
        mock_repo
            .expect_apply_visit_delta()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (service, buffer) = build(mock_repo);
        buffer.record("abc123", Utc::now()).await.unwrap();

        service.flush().await.unwrap();

        // Second cycle finds nothing; the mock would panic on a second merge.
        let report = service.flush().await.unwrap();
        assert_eq!(report, FlushReport::default());
    }

    #[tokio::test]
    async fn test_failed_merge_returns_delta_to_buffer_for_retry() {
        let mut mock_repo = MockUrlRepository::new();
        let mut seq = Sequence::new();

        mock_repo
            .expect_apply_visit_delta()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(AppError::internal("Database error", serde_json::json!({}))));
        mock_repo
            .expect_apply_visit_delta()
            .withf(|code, count, _| code == "abc123" && *count == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let (service, buffer) = build(mock_repo);
        buffer.record("abc123", Utc::now()).await.unwrap();
        buffer.record("abc123", Utc::now()).await.unwrap();

        let report = service.flush().await.unwrap();
        assert_eq!(report, FlushReport { flushed: 0, failed: 1 });

        // The delta survived the failure...
        assert_eq!(buffer.peek("abc123").await.unwrap().unwrap().count, 2);

        // ...and the next cycle delivers it.
        let report = service.flush().await.unwrap();
        assert_eq!(report, FlushReport { flushed: 1, failed: 0 });
        assert!(buffer.peek("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_visits_recorded_after_pop_start_a_fresh_entry() {
        let mut mock_repo = MockUrlRepository::new();
        mock_repo
            .expect_apply_visit_delta()
            .withf(|_, count, _| *count == 2)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (service, buffer) = build(mock_repo);
        buffer.record("abc123", Utc::now()).await.unwrap();
        buffer.record("abc123", Utc::now()).await.unwrap();

        service.flush().await.unwrap();

        // A visit arriving after the flush consumed the delta accumulates
        // separately; nothing was lost to the pop.
        buffer.record("abc123", Utc::now()).await.unwrap();
        assert_eq!(buffer.peek("abc123").await.unwrap().unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_flush_handles_multiple_codes_independently() {
        let mut mock_repo = MockUrlRepository::new();

        mock_repo
            .expect_apply_visit_delta()
            .withf(|code, count, _| code == "aaa111" && *count == 1)
            .times(1)
            .returning(|_, _, _| Ok(()));
        mock_repo
            .expect_apply_visit_delta()
            .withf(|code, count, _| code == "bbb222" && *count == 2)
            .times(1)
            .returning(|_, _, _| Err(AppError::internal("Database error", serde_json::json!({}))));

        let (service, buffer) = build(mock_repo);
        buffer.record("aaa111", Utc::now()).await.unwrap();
        buffer.record("bbb222", Utc::now()).await.unwrap();
        buffer.record("bbb222", Utc::now()).await.unwrap();

        let report = service.flush().await.unwrap();

        assert_eq!(report, FlushReport { flushed: 1, failed: 1 });
        assert!(buffer.peek("aaa111").await.unwrap().is_none());
        assert_eq!(buffer.peek("bbb222").await.unwrap().unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_popped_delta_round_trips_through_merge() {
        // The re-merge contract: a popped delta is re-added verbatim,
        // including its timestamp.
        let at = Utc::now();
        let buffer = MemoryStore::new();
        buffer
            .merge(
                "abc123",
                VisitDelta {
                    count: 9,
                    last_visited_at: Some(at),
                },
            )
            .await
            .unwrap();

        let delta = buffer.pop("abc123").await.unwrap().unwrap();
        assert_eq!(delta.count, 9);
        assert_eq!(delta.last_visited_at, Some(at));
    }
}
