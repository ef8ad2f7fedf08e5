//! Repository trait for the durable URL store.

use crate::domain::entities::{NewUrlRecord, UrlRecord};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result of an insert attempt against the store's unique indexes.
///
/// A rejected insert is a recoverable branch of the encode protocol, not an
/// error: `LongUrlExists` means another writer won the dedup race and the
/// caller should return the winner's record; `CodeTaken` means the generated
/// code collided and the caller should draw a new one.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(UrlRecord),
    LongUrlExists,
    CodeTaken,
}

/// Repository interface for the durable store of record.
///
/// The store is authoritative for `long_url`/`short_code` uniqueness and is the
/// only place aggregated visit counts are persisted.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Inserts a new URL record with a zero visit count.
    ///
    /// Unique violations on either column are reported through
    /// [`InsertOutcome`], never as errors.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors other than unique
    /// violations.
    async fn insert(&self, new_record: NewUrlRecord) -> Result<InsertOutcome, AppError>;

    /// Finds a record by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<UrlRecord>, AppError>;

    /// Finds a record by its original long URL.
    ///
    /// Used by the encoder to deduplicate before allocating a new code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<UrlRecord>, AppError>;

    /// Checks whether a short code is already assigned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn code_exists(&self, short_code: &str) -> Result<bool, AppError>;

    /// Merges a popped visit delta into the durable record.
    ///
    /// Increments the stored visit count by `count` and, when present, replaces
    /// `last_visited_at` with the buffered timestamp. A missing record is a
    /// no-op, matching the buffer's fire-and-forget contract.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors; the caller re-merges
    /// the delta into the buffer so the next flush cycle retries it.
    async fn apply_visit_delta(
        &self,
        short_code: &str,
        count: i64,
        last_visited_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;

    /// Lists records ordered by creation time, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UrlRecord>, AppError>;

    /// Counts all records.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn count(&self) -> Result<i64, AppError>;

    /// Searches records whose long URL matches `query` by text relevance or
    /// substring, or whose short code contains it (case-insensitive), ranked by
    /// relevance where available.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn search(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UrlRecord>, AppError>;

    /// Counts all records matching `query` under the same criteria as
    /// [`Self::search`], independent of pagination.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn search_count(&self, query: &str) -> Result<i64, AppError>;
}
