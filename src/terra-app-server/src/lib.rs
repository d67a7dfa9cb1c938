//! Terra App Server - HTTP API for the Terra environmental-science assistant.
//!
//! This crate provides:
//! - `POST /api/chat`, which forwards a user message plus the session's
//!   rolling history to the completion provider
//! - `GET /api/health`
//! - Single-origin CORS with credentials, request IDs and request logging

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use axum::{Router, middleware::from_fn};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Run the server with the given configuration.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    run_with_shutdown(config, std::future::pending()).await
}

/// Run the server with graceful shutdown support.
pub async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(config)?);
    state.start_cleanup_task();

    info!(
        model = %state.config.provider.model,
        cors_origin = %state.config.cors_origin,
        max_messages = state.config.conversation.max_messages,
        max_sessions = state.config.conversation.max_sessions,
        "Starting Terra server on {}",
        addr
    );

    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    create_router_with_state(Arc::new(state))
}

/// Create the application router with an Arc-wrapped state.
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.cors_origin().clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-session-id"),
        ]);

    Router::new()
        .nest("/api", api::routes())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(from_fn(middleware::timing_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
