//! Ephemeral store traits and error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors that can occur during ephemeral store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),
    #[error("Cache operation error: {0}")]
    Operation(String),
}

/// Result type for ephemeral store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for the redirect cache: short code to long URL.
///
/// The mapping is immutable once created, so entries are only ever populated,
/// never invalidated. Losing an entry costs one durable-store read, nothing
/// more, so implementations must be fail-open: a failed read is a miss and a
/// failed write is dropped, neither disrupts the request.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisStore`] - Redis-backed, with TTL
/// - [`crate::infrastructure::cache::MemoryStore`] - in-process fallback and test double
#[async_trait]
pub trait RedirectCache: Send + Sync {
    /// Retrieves the long URL for a short code.
    ///
    /// Returns `Ok(None)` on miss; backend errors are logged and reported as
    /// misses.
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>>;

    /// Stores a short code to long URL mapping.
    ///
    /// Backend errors are logged and swallowed.
    async fn set_url(&self, short_code: &str, long_url: &str) -> CacheResult<()>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;
}

/// Visits buffered for one short code since the last flush.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitDelta {
    pub count: i64,
    pub last_visited_at: Option<DateTime<Utc>>,
}

/// Trait for the write-behind visit counter buffer.
///
/// Unlike the redirect cache, buffered deltas are the authoritative record of
/// visits not yet absorbed by the durable store, so operations here surface
/// their errors instead of failing open. [`Self::pop`] is the flush job's unit
/// of work: it must read and clear in one indivisible step so that increments
/// arriving mid-flush land in a fresh entry rather than being read-then-lost.
#[async_trait]
pub trait VisitBuffer: Send + Sync {
    /// Counts one visit: atomically increments the pending count for the code
    /// and records `at` as the pending last-visited timestamp.
    async fn record(&self, short_code: &str, at: DateTime<Utc>) -> CacheResult<()>;

    /// Reads the pending delta without consuming it.
    ///
    /// Used to overlay live counts onto durable records at read time.
    async fn peek(&self, short_code: &str) -> CacheResult<Option<VisitDelta>>;

    /// Atomically removes and returns the pending delta for the code.
    ///
    /// Returns `Ok(None)` when nothing is buffered.
    async fn pop(&self, short_code: &str) -> CacheResult<Option<VisitDelta>>;

    /// Adds a previously popped delta back into the buffer.
    ///
    /// Called when the durable merge fails, preserving the delta for the next
    /// flush cycle. Counts accumulate; a timestamp already recorded by a newer
    /// visit wins over the re-merged one.
    async fn merge(&self, short_code: &str, delta: VisitDelta) -> CacheResult<()>;

    /// Returns the short codes that currently have buffered visits.
    async fn pending_codes(&self) -> CacheResult<Vec<String>>;
}
