//! URL record entity representing a short code to long URL mapping.

use chrono::{DateTime, Utc};

/// A shortened URL mapping with its durable visit statistics.
///
/// `visit_count` and `last_visited_at` hold what the durable store has absorbed
/// so far; visits buffered in the ephemeral store are overlaid at read time and
/// are not part of this entity. The `short_code → long_url` mapping is immutable
/// once created.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlRecord {
    pub id: i64,
    pub long_url: String,
    pub short_code: String,
    pub created_at: DateTime<Utc>,
    pub visit_count: i64,
    pub last_visited_at: Option<DateTime<Utc>>,
}

impl UrlRecord {
    /// Creates a new UrlRecord instance.
    pub fn new(
        id: i64,
        long_url: String,
        short_code: String,
        created_at: DateTime<Utc>,
        visit_count: i64,
        last_visited_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            long_url,
            short_code,
            created_at,
            visit_count,
            last_visited_at,
        }
    }
}

/// Input data for creating a new URL record.
///
/// New records always start with a zero visit count.
#[derive(Debug, Clone)]
pub struct NewUrlRecord {
    pub long_url: String,
    pub short_code: String,
}
