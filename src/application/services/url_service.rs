//! URL encoding and resolution service.

use std::sync::Arc;

use crate::domain::entities::{NewUrlRecord, UrlRecord};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;
use crate::infrastructure::cache::RedirectCache;
use crate::utils::code_generator::{DEFAULT_CODE_LENGTH, generate_code};
use serde_json::json;
use tracing::debug;

/// Attempts before giving up on finding a free short code.
const MAX_CODE_ATTEMPTS: usize = 10;

/// Service for creating short codes and resolving them back to long URLs.
///
/// Encoding deduplicates by long URL, so the same URL always maps to the same
/// code no matter how often or how concurrently it is submitted. Resolution is
/// a cache-aside read: the redirect cache is consulted first and repopulated
/// from the durable store on miss. Because a mapping never changes after
/// creation, the cache needs population only, never invalidation.
pub struct UrlService<R: UrlRepository> {
    repository: Arc<R>,
    cache: Arc<dyn RedirectCache>,
    base_url: String,
}

impl<R: UrlRepository> UrlService<R> {
    /// Creates a new URL service.
    ///
    /// `base_url` is the public origin short URLs are built from.
    pub fn new(repository: Arc<R>, cache: Arc<dyn RedirectCache>, base_url: String) -> Self {
        Self {
            repository,
            cache,
            base_url,
        }
    }

    /// Shortens a long URL, creating a record only if none exists for it.
    ///
    /// Two concurrent encodes of the same brand-new URL can both miss the
    /// dedup lookup; the unique index on `long_url` rejects the second insert
    /// and the loser re-resolves and returns the winner's record. A generated
    /// code colliding with an existing one is likewise reported by the unique
    /// index and answered by drawing a new code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if no free code is found within the
    /// attempt bound, or on database errors.
    pub async fn encode(&self, long_url: &str) -> Result<UrlRecord, AppError> {
        if let Some(existing) = self.repository.find_by_long_url(long_url).await? {
            self.prime_cache(&existing.short_code, long_url).await;
            return Ok(existing);
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(DEFAULT_CODE_LENGTH);

            if self.repository.code_exists(&code).await? {
                continue;
            }

            let new_record = NewUrlRecord {
                long_url: long_url.to_string(),
                short_code: code,
            };

            match self.repository.insert(new_record).await? {
                InsertOutcome::Inserted(record) => {
                    self.prime_cache(&record.short_code, long_url).await;
                    return Ok(record);
                }
                InsertOutcome::CodeTaken => continue,
                InsertOutcome::LongUrlExists => {
                    // Lost the dedup race; the winner's record must exist now.
                    let winner = self
                        .repository
                        .find_by_long_url(long_url)
                        .await?
                        .ok_or_else(|| {
                            AppError::internal(
                                "Record vanished after duplicate rejection",
                                json!({ "long_url": long_url }),
                            )
                        })?;
                    self.prime_cache(&winner.short_code, long_url).await;
                    return Ok(winner);
                }
            }
        }

        Err(AppError::internal(
            "Short code keyspace exhausted",
            json!({ "attempts": MAX_CODE_ATTEMPTS }),
        ))
    }

    /// Resolves a short code to its long URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the code is in neither the cache nor
    /// the durable store. Returns [`AppError::Internal`] on database errors.
    pub async fn decode(&self, short_code: &str) -> Result<String, AppError> {
        if let Ok(Some(cached)) = self.cache.get_url(short_code).await {
            return Ok(cached);
        }

        let record = self
            .repository
            .find_by_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", json!({ "code": short_code }))
            })?;

        self.prime_cache(short_code, &record.long_url).await;

        Ok(record.long_url)
    }

    /// Constructs the full short URL for a code.
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), short_code)
    }

    /// Populates the redirect cache; failures cost a future durable read only.
    async fn prime_cache(&self, short_code: &str, long_url: &str) {
        if let Err(e) = self.cache.set_url(short_code, long_url).await {
            debug!("Failed to prime redirect cache for {}: {}", short_code, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUrlRepository;
    use crate::infrastructure::cache::{MemoryStore, RedirectCache};
    use chrono::Utc;
    use mockall::Sequence;

    fn test_record(id: i64, code: &str, url: &str) -> UrlRecord {
        UrlRecord::new(id, url.to_string(), code.to_string(), Utc::now(), 0, None)
    }

    fn service(repo: MockUrlRepository) -> (UrlService<MockUrlRepository>, Arc<MemoryStore>) {
        let cache = Arc::new(MemoryStore::new());
        let service = UrlService::new(
            Arc::new(repo),
            cache.clone(),
            "https://sho.rt".to_string(),
        );
        (service, cache)
    }

    #[tokio::test]
    async fn test_encode_new_url_allocates_code() {
        let mut mock_repo = MockUrlRepository::new();

        mock_repo
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        mock_repo.expect_code_exists().times(1).returning(|_| Ok(false));

        mock_repo
            .expect_insert()
            .withf(|new_record| {
                new_record.long_url == "https://example.com"
                    && new_record.short_code.len() == 6
                    && new_record.short_code.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .times(1)
            .returning(|new_record| {
                Ok(InsertOutcome::Inserted(test_record(
                    1,
                    &new_record.short_code,
                    &new_record.long_url,
                )))
            });

        let (service, cache) = service(mock_repo);

        let record = service.encode("https://example.com").await.unwrap();

        assert_eq!(record.long_url, "https://example.com");
        assert_eq!(record.visit_count, 0);

        // The new mapping is primed into the redirect cache.
        assert_eq!(
            cache.get_url(&record.short_code).await.unwrap(),
            Some("https://example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_encode_is_idempotent_for_known_url() {
        let mut mock_repo = MockUrlRepository::new();

        let existing = test_record(5, "known1", "https://example.com");
        mock_repo
            .expect_find_by_long_url()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        mock_repo.expect_insert().times(0);

        let (service, cache) = service(mock_repo);

        let record = service.encode("https://example.com").await.unwrap();

        assert_eq!(record.id, 5);
        assert_eq!(record.short_code, "known1");
        assert_eq!(
            cache.get_url("known1").await.unwrap(),
            Some("https://example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_encode_returns_winner_after_dedup_race() {
        let mut mock_repo = MockUrlRepository::new();
        let mut seq = Sequence::new();

        // First lookup misses, the insert is rejected on long_url, the
        // re-lookup finds the winner.
        mock_repo
            .expect_find_by_long_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        mock_repo
            .expect_code_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        mock_repo
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InsertOutcome::LongUrlExists));
        mock_repo
            .expect_find_by_long_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(test_record(9, "winner", "https://example.com"))));

        let (service, _) = service(mock_repo);

        let record = service.encode("https://example.com").await.unwrap();

        assert_eq!(record.short_code, "winner");
    }

    #[tokio::test]
    async fn test_encode_retries_on_code_collision() {
        let mut mock_repo = MockUrlRepository::new();

        mock_repo
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        mock_repo.expect_code_exists().times(2).returning(|_| Ok(false));

        let mut seq = Sequence::new();
        mock_repo
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(InsertOutcome::CodeTaken));
        mock_repo
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new_record| {
                Ok(InsertOutcome::Inserted(test_record(
                    2,
                    &new_record.short_code,
                    &new_record.long_url,
                )))
            });

        let (service, _) = service(mock_repo);

        let record = service.encode("https://example.com").await.unwrap();
        assert_eq!(record.id, 2);
    }

    #[tokio::test]
    async fn test_encode_fails_when_keyspace_exhausted() {
        let mut mock_repo = MockUrlRepository::new();

        mock_repo
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        // Every candidate is already assigned.
        mock_repo
            .expect_code_exists()
            .times(MAX_CODE_ATTEMPTS)
            .returning(|_| Ok(true));
        mock_repo.expect_insert().times(0);

        let (service, _) = service(mock_repo);

        let result = service.encode("https://example.com").await;

        assert!(matches!(result.unwrap_err(), AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_decode_hits_cache_without_durable_read() {
        let mut mock_repo = MockUrlRepository::new();
        mock_repo.expect_find_by_code().times(0);

        let (service, cache) = service(mock_repo);
        cache.set_url("abc123", "https://example.com").await.unwrap();

        let long_url = service.decode("abc123").await.unwrap();
        assert_eq!(long_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_decode_miss_primes_cache() {
        let mut mock_repo = MockUrlRepository::new();

        mock_repo
            .expect_find_by_code()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(Some(test_record(1, "abc123", "https://example.com"))));

        let (service, _) = service(mock_repo);

        // First decode reads through; second is served from cache (the mock
        // would panic on a second durable read).
        assert_eq!(service.decode("abc123").await.unwrap(), "https://example.com");
        assert_eq!(service.decode("abc123").await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn test_decode_unknown_code_is_not_found() {
        let mut mock_repo = MockUrlRepository::new();
        mock_repo.expect_find_by_code().times(1).returning(|_| Ok(None));

        let (service, _) = service(mock_repo);

        let result = service.decode("nope42").await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_short_url_joins_base_and_code() {
        let (service, _) = service(MockUrlRepository::new());
        assert_eq!(service.short_url("abc123"), "https://sho.rt/abc123");

        let with_slash = UrlService::new(
            Arc::new(MockUrlRepository::new()),
            Arc::new(MemoryStore::new()),
            "https://sho.rt/".to_string(),
        );
        assert_eq!(with_slash.short_url("abc123"), "https://sho.rt/abc123");
    }
}
