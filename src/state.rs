use std::sync::Arc;

use sqlx::PgPool;

use crate::application::services::{StatsService, UrlService};
use crate::infrastructure::cache::RedirectCache;
use crate::infrastructure::persistence::PgUrlRepository;

/// Shared application state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub url_service: Arc<UrlService<PgUrlRepository>>,
    pub stats_service: Arc<StatsService<PgUrlRepository>>,
    pub cache: Arc<dyn RedirectCache>,
}
