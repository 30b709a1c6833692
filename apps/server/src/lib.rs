//! HTTP server for the dynamo video analysis API.
//!
//! - `GET /` welcome message
//! - `POST /analyze_video` key concepts of a YouTube video

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub const DEFAULT_PORT: u16 = 8000;

/// Router with permissive CORS and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown_signal` completes. In-flight extractions are
/// cancelled through the state's shutdown token.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = state.shutdown.clone();
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Video analysis API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal.await;
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
