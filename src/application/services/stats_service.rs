//! Visit counting and statistics service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;

use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::VisitBuffer;

/// Minimum search query length, enforced before any store access.
const MIN_QUERY_LENGTH: usize = 3;

/// A URL record with buffered visits overlaid.
///
/// `visit_count` here is the live count: what the durable store has absorbed
/// plus whatever is still pending in the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlStats {
    pub id: i64,
    pub long_url: String,
    pub short_code: String,
    pub created_at: DateTime<Utc>,
    pub visit_count: i64,
    pub last_visited_at: Option<DateTime<Utc>>,
}

/// One page of listed or searched records with live counts.
#[derive(Debug, Clone)]
pub struct UrlPage {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub items: Vec<UrlStats>,
}

/// Service for recording visits and reading statistics.
///
/// Visits are write-behind: [`Self::record_visit`] touches only the ephemeral
/// buffer, so heavy redirect traffic costs the durable store nothing until the
/// flush job merges the deltas. All read paths overlay the pending delta onto
/// the durable record, so counts are live even between flushes.
pub struct StatsService<R: UrlRepository> {
    repository: Arc<R>,
    buffer: Arc<dyn VisitBuffer>,
}

impl<R: UrlRepository> StatsService<R> {
    /// Creates a new statistics service.
    pub fn new(repository: Arc<R>, buffer: Arc<dyn VisitBuffer>) -> Self {
        Self { repository, buffer }
    }

    /// Counts one visit to a short code.
    ///
    /// Buffers the increment and the visit time in the ephemeral store; the
    /// durable store is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the buffer write fails. Callers on the
    /// redirect path should log and continue; the redirect itself must not
    /// depend on counting.
    pub async fn record_visit(&self, short_code: &str) -> Result<(), AppError> {
        self.buffer
            .record(short_code, Utc::now())
            .await
            .map_err(|e| {
                AppError::internal(
                    "Failed to buffer visit",
                    json!({ "code": short_code, "reason": e.to_string() }),
                )
            })?;

        metrics::counter!("visits_recorded_total").increment(1);
        Ok(())
    }

    /// Retrieves a record with its live visit count and last-visited time.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no record matches the code.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn get_stats(&self, short_code: &str) -> Result<UrlStats, AppError> {
        let record = self
            .repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", json!({ "code": short_code }))
            })?;

        Ok(self.overlay(record).await)
    }

    /// Lists records newest first, with live counts.
    ///
    /// `total` is the full record count, independent of the requested page.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for `page < 1` or `limit < 1`.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn list(&self, page: u32, limit: u32) -> Result<UrlPage, AppError> {
        let offset = Self::offset(page, limit)?;

        let (records, total) = tokio::try_join!(
            self.repository.list(offset, limit as i64),
            self.repository.count()
        )?;

        Ok(UrlPage {
            total,
            page,
            limit,
            items: self.overlay_all(records).await,
        })
    }

    /// Searches records by long URL text/substring or short code substring,
    /// with live counts.
    ///
    /// Queries shorter than three characters are rejected before any store is
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for short queries or bad pagination.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn search(&self, query: &str, page: u32, limit: u32) -> Result<UrlPage, AppError> {
        if query.chars().count() < MIN_QUERY_LENGTH {
            return Err(AppError::bad_request(
                "Query must be at least 3 characters",
                json!({ "query": query }),
            ));
        }

        let offset = Self::offset(page, limit)?;

        let (records, total) = tokio::try_join!(
            self.repository.search(query, offset, limit as i64),
            self.repository.search_count(query)
        )?;

        Ok(UrlPage {
            total,
            page,
            limit,
            items: self.overlay_all(records).await,
        })
    }

    fn offset(page: u32, limit: u32) -> Result<i64, AppError> {
        if page < 1 {
            return Err(AppError::bad_request(
                "Page must be greater than 0",
                json!({ "page": page }),
            ));
        }
        if limit < 1 {
            return Err(AppError::bad_request(
                "Limit must be greater than 0",
                json!({ "limit": limit }),
            ));
        }

        Ok(((page - 1) as i64) * (limit as i64))
    }

    /// Overlays the buffered delta onto a durable record.
    ///
    /// A buffer read failure degrades to the durable values; the buffered
    /// visits are still in the buffer and will show up once it recovers.
    async fn overlay(&self, record: UrlRecord) -> UrlStats {
        let delta = match self.buffer.peek(&record.short_code).await {
            Ok(delta) => delta,
            Err(e) => {
                warn!(
                    "Visit buffer unavailable for {}, serving durable counts: {}",
                    record.short_code, e
                );
                None
            }
        };

        let (pending_count, pending_visited) = delta
            .map(|d| (d.count, d.last_visited_at))
            .unwrap_or((0, None));

        UrlStats {
            id: record.id,
            long_url: record.long_url,
            short_code: record.short_code,
            created_at: record.created_at,
            visit_count: record.visit_count + pending_count,
            last_visited_at: pending_visited.or(record.last_visited_at),
        }
    }

    async fn overlay_all(&self, records: Vec<UrlRecord>) -> Vec<UrlStats> {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            items.push(self.overlay(record).await);
        }
        items
    }
}
