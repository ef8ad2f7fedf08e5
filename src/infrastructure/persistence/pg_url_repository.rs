//! PostgreSQL implementation of the URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::domain::entities::{NewUrlRecord, UrlRecord};
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on;

const LONG_URL_CONSTRAINT: &str = "urls_long_url_key";
const SHORT_CODE_CONSTRAINT: &str = "urls_short_code_key";

const SELECT_COLUMNS: &str =
    "id, long_url, short_code, created_at, visit_count, last_visited_at";

/// PostgreSQL repository for URL record storage and retrieval.
///
/// All queries are parameterized; the unique indexes on `long_url` and
/// `short_code` are the authority for dedup and code allocation.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UrlRow {
    id: i64,
    long_url: String,
    short_code: String,
    created_at: DateTime<Utc>,
    visit_count: i64,
    last_visited_at: Option<DateTime<Utc>>,
}

impl From<UrlRow> for UrlRecord {
    fn from(row: UrlRow) -> Self {
        UrlRecord::new(
            row.id,
            row.long_url,
            row.short_code,
            row.created_at,
            row.visit_count,
            row.last_visited_at,
        )
    }
}

/// Escapes LIKE metacharacters and wraps the query in wildcards.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn insert(&self, new_record: NewUrlRecord) -> Result<InsertOutcome, AppError> {
        let sql = format!(
            "INSERT INTO urls (long_url, short_code) VALUES ($1, $2) RETURNING {}",
            SELECT_COLUMNS
        );

        match sqlx::query_as::<_, UrlRow>(&sql)
            .bind(&new_record.long_url)
            .bind(&new_record.short_code)
            .fetch_one(self.pool.as_ref())
            .await
        {
            Ok(row) => Ok(InsertOutcome::Inserted(row.into())),
            Err(e) if is_unique_violation_on(&e, LONG_URL_CONSTRAINT) => {
                Ok(InsertOutcome::LongUrlExists)
            }
            Err(e) if is_unique_violation_on(&e, SHORT_CODE_CONSTRAINT) => {
                Ok(InsertOutcome::CodeTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<UrlRecord>, AppError> {
        let sql = format!("SELECT {} FROM urls WHERE short_code = $1", SELECT_COLUMNS);

        let row = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(short_code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(UrlRecord::from))
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<UrlRecord>, AppError> {
        let sql = format!("SELECT {} FROM urls WHERE long_url = $1", SELECT_COLUMNS);

        let row = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(long_url)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(UrlRecord::from))
    }

    async fn code_exists(&self, short_code: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM urls WHERE short_code = $1)")
                .bind(short_code)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(exists)
    }

    async fn apply_visit_delta(
        &self,
        short_code: &str,
        count: i64,
        last_visited_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE urls
            SET visit_count = visit_count + $2,
                last_visited_at = COALESCE($3, last_visited_at)
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .bind(count)
        .bind(last_visited_at)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            warn!(
                "Dropping visit delta for unknown short code {} (count: {})",
                short_code, count
            );
        }

        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<UrlRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM urls ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(UrlRecord::from).collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn search(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UrlRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM urls
            WHERE to_tsvector('simple', long_url) @@ plainto_tsquery('simple', $1)
               OR long_url ILIKE $2
               OR short_code ILIKE $2
            ORDER BY
                ts_rank(to_tsvector('simple', long_url), plainto_tsquery('simple', $1)) DESC,
                created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(UrlRecord::from).collect())
    }

    async fn search_count(&self, query: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM urls
            WHERE to_tsvector('simple', long_url) @@ plainto_tsquery('simple', $1)
               OR long_url ILIKE $2
               OR short_code ILIKE $2
            "#,
        )
        .bind(query)
        .bind(like_pattern(query))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_in_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
