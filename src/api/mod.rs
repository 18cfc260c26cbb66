//! HTTP API server module
//!
//! Starts background downloads and serves each stored item back exactly once.

use crate::Result;
use axum::{Router, http::HeaderValue, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod serve;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Videos
/// - `GET /video/download?url=..&requester=..` - Start a download in the background
/// - `GET /video/:id` - Serve a stored item, then delete it
/// - `HEAD /video/:id` - Describe a stored item; nothing is deleted
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // `/video/download` is matched before the `/video/:id` capture. HEAD has
    // its own handler so it never falls back to the consuming GET.
    let router = Router::new()
        .route("/video/download", get(routes::start_download))
        .route(
            "/video/:id",
            get(routes::get_video).head(routes::head_video),
        )
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.cors_enabled {
        let cors = build_cors_layer(&config.server.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until SIGINT/SIGTERM is received or `state.shutdown` is cancelled.
/// Either way the shutdown token is cancelled, which stops in-flight
/// transfers (their partial files are removed), and open connections are
/// drained before returning.
///
/// # Example
///
/// ```no_run
/// use media_dl::api::{AppState, start_api_server};
/// use media_dl::{Config, Downloader, HttpFetcher, LocalFileSystem, RecordStore};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::load(None)?);
/// let downloader = Downloader::new(
///     config.clone(),
///     Arc::new(HttpFetcher::default()),
///     Arc::new(LocalFileSystem),
///     Arc::new(RecordStore::new()),
///     media_dl::notifier::from_config(&config.notifier),
/// );
///
/// start_api_server(AppState::new(Arc::new(downloader), config)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(state: AppState) -> Result<()> {
    let bind_address = state.config.server.bind_address;
    let shutdown = state.shutdown.clone();

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(state);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = crate::wait_for_signal() => {}
                _ = shutdown.cancelled() => {}
            }
            tracing::info!("API server shutting down");
            shutdown.cancel();
        })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
