//! Nav Bookmarks Backend
//!
//! REST backend for a personal bookmark navigator. The whole bookmark set is
//! stored as one versioned dataset in a key-value store, with a rotating
//! history of the last ten versions.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod export;
mod models;
mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, StorageBackend};
use db::{KvStore, MemoryKv, SqliteKv};
use store::{DatasetStore, RetentionSweeper};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DatasetStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Nav Bookmarks Backend");
    tracing::info!("Storage backend: {:?}", config.storage);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_key.is_none() {
        tracing::warn!("No API key configured (NAV_API_KEY). Authentication is disabled!");
    }

    let kv: Arc<dyn KvStore> = match config.storage {
        StorageBackend::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            let pool = db::init_database(&config.db_path).await?;
            Arc::new(SqliteKv::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryKv::new())
        }
    };
    let store = Arc::new(DatasetStore::new(kv));

    // Make sure the seed exists before the first request.
    let current = store.get_current().await?;
    tracing::info!(
        "Dataset version {} with {} categories and {} bookmarks",
        current.version,
        current.categories.len(),
        current.bookmarks.len()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let sweeper_handle = if config.sweep_interval_secs > 0 {
        let sweeper = RetentionSweeper::new(
            store.clone(),
            Duration::from_secs(config.sweep_interval_secs),
            shutdown_rx,
        );
        Some(tokio::spawn(sweeper.run()))
    } else {
        tracing::info!("Scheduled retention sweep disabled");
        None
    };

    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    shutdown_tx.send(()).ok();
    if let Some(handle) = sweeper_handle {
        handle.await.ok();
    }

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone the key for the auth layer
    let api_key = state.config.api_key.clone();

    // Public read access; private entries are gated inside the handler
    let public_routes = Router::new().route("/bookmarks", get(api::list_bookmarks));

    // Management routes
    let managed_routes = Router::new()
        // Bookmarks
        .route("/bookmarks", post(api::create_bookmark))
        .route(
            "/bookmarks/{id}",
            put(api::update_bookmark).delete(api::delete_bookmark),
        )
        // Categories
        .route("/categories", post(api::create_category))
        .route("/categories/empty", get(api::list_empty_categories))
        .route("/categories/cleanup", post(api::cleanup_empty_categories))
        .route(
            "/categories/{id}",
            put(api::update_category).delete(api::delete_category),
        )
        // Organizing
        .route("/sort", post(api::sort))
        .route("/batch", post(api::batch))
        // Import / export
        .route("/export", get(api::export_bookmarks))
        .route("/import", post(api::import_bookmarks))
        // Backups
        .route("/backups", get(api::list_backups))
        .route("/backups/restore", post(api::restore_backup))
        .route("/backups/sweep", post(api::sweep_backups))
        .layer(middleware::from_fn(move |req, next| {
            auth::api_key_auth_layer(api_key.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(managed_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
