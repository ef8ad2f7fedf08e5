//! Redis-backed redirect cache and visit counter buffer.

use super::service::{CacheError, CacheResult, RedirectCache, VisitBuffer, VisitDelta};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

/// Key prefix for redirect cache entries.
const URL_PREFIX: &str = "url:";
/// Key prefix for buffered visit counts.
const VISIT_COUNT_PREFIX: &str = "visitCount:";
/// Key prefix for buffered last-visited timestamps.
const LAST_VISITED_PREFIX: &str = "lastVisitedAt:";

/// Redis implementation of both ephemeral store contracts.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection
/// reuse. Redirect cache operations are fail-open; visit buffer operations
/// surface errors so the flush job can retry.
///
/// The count key is the authority for the no-loss guarantee: `INCR` makes
/// recording atomic and `GETDEL` makes consumption atomic. The timestamp key
/// is best-effort alongside it.
pub struct RedisStore {
    client: ConnectionManager,
    default_ttl: u64,
}

impl RedisStore {
    /// Connects to Redis, validates the connection with a PING, and configures
    /// the TTL applied to redirect cache entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid, the connection
    /// cannot be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
        })
    }

    fn url_key(short_code: &str) -> String {
        format!("{}{}", URL_PREFIX, short_code)
    }

    fn count_key(short_code: &str) -> String {
        format!("{}{}", VISIT_COUNT_PREFIX, short_code)
    }

    fn visited_key(short_code: &str) -> String {
        format!("{}{}", LAST_VISITED_PREFIX, short_code)
    }
}

fn op_err(e: redis::RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| warn!("Discarding unparseable buffered timestamp {:?}: {}", s, e))
            .ok()
    })
}

#[async_trait]
impl RedirectCache for RedisStore {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        let key = Self::url_key(short_code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(url)) => {
                debug!("Cache HIT: {} -> {}", short_code, url);
                metrics::counter!("redirect_cache_hits_total").increment(1);
                Ok(Some(url))
            }
            Ok(None) => {
                debug!("Cache MISS: {}", short_code);
                metrics::counter!("redirect_cache_misses_total").increment(1);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", short_code, e);
                Ok(None)
            }
        }
    }

    async fn set_url(&self, short_code: &str, long_url: &str) -> CacheResult<()> {
        let key = Self::url_key(short_code);
        let mut conn = self.client.clone();

        match conn
            .set_ex::<_, _, ()>(&key, long_url, self.default_ttl)
            .await
        {
            Ok(_) => {
                debug!(
                    "Cache SET: {} -> {} (TTL: {}s)",
                    short_code, long_url, self.default_ttl
                );
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", short_code, e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}

#[async_trait]
impl VisitBuffer for RedisStore {
    async fn record(&self, short_code: &str, at: DateTime<Utc>) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let _: i64 = conn
            .incr(Self::count_key(short_code), 1i64)
            .await
            .map_err(op_err)?;
        let _: () = conn
            .set(Self::visited_key(short_code), at.to_rfc3339())
            .await
            .map_err(op_err)?;

        Ok(())
    }

    async fn peek(&self, short_code: &str) -> CacheResult<Option<VisitDelta>> {
        let mut conn = self.client.clone();

        let count: Option<i64> = conn
            .get(Self::count_key(short_code))
            .await
            .map_err(op_err)?;
        let Some(count) = count else {
            return Ok(None);
        };

        let raw_visited: Option<String> = conn
            .get(Self::visited_key(short_code))
            .await
            .map_err(op_err)?;

        Ok(Some(VisitDelta {
            count,
            last_visited_at: parse_timestamp(raw_visited),
        }))
    }

    async fn pop(&self, short_code: &str) -> CacheResult<Option<VisitDelta>> {
        let mut conn = self.client.clone();

        // GETDEL on the count key is the atomic unit of work; a visit recorded
        // after this point starts a fresh entry and is picked up next cycle.
        let count: Option<i64> = conn
            .get_del(Self::count_key(short_code))
            .await
            .map_err(op_err)?;
        let Some(count) = count else {
            return Ok(None);
        };

        let raw_visited: Option<String> = conn
            .get_del(Self::visited_key(short_code))
            .await
            .map_err(op_err)?;

        Ok(Some(VisitDelta {
            count,
            last_visited_at: parse_timestamp(raw_visited),
        }))
    }

    async fn merge(&self, short_code: &str, delta: VisitDelta) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let _: i64 = conn
            .incr(Self::count_key(short_code), delta.count)
            .await
            .map_err(op_err)?;

        // NX: a timestamp written by a visit newer than the popped delta wins.
        if let Some(at) = delta.last_visited_at {
            let _: bool = conn
                .set_nx(Self::visited_key(short_code), at.to_rfc3339())
                .await
                .map_err(op_err)?;
        }

        Ok(())
    }

    async fn pending_codes(&self) -> CacheResult<Vec<String>> {
        let mut conn = self.client.clone();
        let pattern = format!("{}*", VISIT_COUNT_PREFIX);
        let mut codes = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(op_err)?;

            codes.extend(
                keys.into_iter()
                    .filter_map(|k| k.strip_prefix(VISIT_COUNT_PREFIX).map(str::to_owned)),
            );

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(codes)
    }
}
