//! In-process implementation of the ephemeral store contracts.

use super::service::{CacheResult, RedirectCache, VisitBuffer, VisitDelta};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// A `HashMap`-backed store implementing both the redirect cache and the visit
/// counter buffer.
///
/// Used when Redis is not configured (single-process deployments) and as the
/// store substitute in tests. The mutex around the visit map makes `pop` a
/// genuine read-and-clear: a `record` either lands before the pop and is
/// consumed, or after it and starts a fresh entry.
#[derive(Default)]
pub struct MemoryStore {
    urls: Mutex<HashMap<String, String>>,
    visits: Mutex<HashMap<String, VisitDelta>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        debug!("Using in-process ephemeral store");
        Self::default()
    }
}

#[async_trait]
impl RedirectCache for MemoryStore {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        Ok(self.urls.lock().unwrap().get(short_code).cloned())
    }

    async fn set_url(&self, short_code: &str, long_url: &str) -> CacheResult<()> {
        self.urls
            .lock()
            .unwrap()
            .insert(short_code.to_string(), long_url.to_string());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[async_trait]
impl VisitBuffer for MemoryStore {
    async fn record(&self, short_code: &str, at: DateTime<Utc>) -> CacheResult<()> {
        let mut visits = self.visits.lock().unwrap();
        let entry = visits.entry(short_code.to_string()).or_insert(VisitDelta {
            count: 0,
            last_visited_at: None,
        });
        entry.count += 1;
        entry.last_visited_at = Some(at);
        Ok(())
    }

    async fn peek(&self, short_code: &str) -> CacheResult<Option<VisitDelta>> {
        Ok(self.visits.lock().unwrap().get(short_code).cloned())
    }

    async fn pop(&self, short_code: &str) -> CacheResult<Option<VisitDelta>> {
        Ok(self.visits.lock().unwrap().remove(short_code))
    }

    async fn merge(&self, short_code: &str, delta: VisitDelta) -> CacheResult<()> {
        let mut visits = self.visits.lock().unwrap();
        match visits.get_mut(short_code) {
            Some(entry) => {
                // Visits recorded since the pop carry a newer timestamp.
                entry.count += delta.count;
                if entry.last_visited_at.is_none() {
                    entry.last_visited_at = delta.last_visited_at;
                }
            }
            None => {
                visits.insert(short_code.to_string(), delta);
            }
        }
        Ok(())
    }

    async fn pending_codes(&self) -> CacheResult<Vec<String>> {
        Ok(self.visits.lock().unwrap().keys().cloned().collect())
    }
}
