pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use flashcard_core::{Clock, SystemClock};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::services::SessionManager;
use crate::store::{ReviewStore, UserStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReviewStore>,
    pub users: Arc<dyn UserStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(self.store.clone(), self.clock.clone())
    }
}

/// Build the HTTP router around the given state.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let protected_routes = Router::new()
        .route("/api/study/stats", get(routes::study::general_stats))
        .route("/api/study/cards/due", get(routes::study::due_cards))
        .route("/api/study/cards/:card_id", delete(routes::study::reset_progress))
        .route("/api/study/session", get(routes::study::start_session))
        .route("/api/study/session/:deck_id", get(routes::study::start_deck_session))
        .route("/api/study/review", post(routes::study::review))
        .route("/api/study/decks/:deck_id/progress", get(routes::study::deck_progress))
        .route("/api/study/analysis", get(routes::study::analysis))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/study/health", get(routes::study::health))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Connecting to database...");
    let db = Arc::new(Database::connect(&config.database).await?);

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let state = AppState {
        store: db.clone(),
        users: db.clone(),
        clock: Arc::new(SystemClock),
    };
    let app = router(state, config.request_timeout);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing database pool");
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

async fn health_check() -> &'static str {
    "OK"
}
