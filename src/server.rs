//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, ephemeral store setup, flush job spawning, and
//! Axum server lifecycle.

use crate::application::services::{FlushService, StatsService, UrlService};
use crate::config::Config;
use crate::infrastructure::cache::{MemoryStore, RedirectCache, RedisStore, VisitBuffer};
use crate::infrastructure::persistence::PgUrlRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::Result;
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis-backed ephemeral store (or in-process fallback)
/// - Background visit count flush job
/// - Axum HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    // The same store backs both ephemeral namespaces: the redirect cache and
    // the visit buffer.
    let (cache, buffer): (Arc<dyn RedirectCache>, Arc<dyn VisitBuffer>) =
        if let Some(redis_url) = &config.redis_url {
            match RedisStore::connect(redis_url, config.cache_ttl_seconds).await {
                Ok(store) => {
                    tracing::info!("Ephemeral store enabled (Redis)");
                    let store = Arc::new(store);
                    (store.clone(), store)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to connect to Redis: {}. Using in-process store.",
                        e
                    );
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store)
                }
            }
        } else {
            tracing::info!("Redis not configured, using in-process ephemeral store");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        };

    let repository = Arc::new(PgUrlRepository::new(Arc::new(pool.clone())));

    let url_service = Arc::new(UrlService::new(
        repository.clone(),
        cache.clone(),
        config.base_url.clone(),
    ));
    let stats_service = Arc::new(StatsService::new(repository.clone(), buffer.clone()));

    let flush_service = FlushService::new(repository, buffer);
    tokio::spawn(flush_service.run(Duration::from_secs(config.flush_interval_secs)));
    tracing::info!("Flush job started");

    let state = AppState {
        db: pool,
        url_service,
        stats_service,
        cache,
    };

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
