pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::RiskClient;
use crate::dashboard::SharedDashboard;
use crate::stream::connection::ConnectionStatus;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: SharedDashboard,
    pub client: RiskClient,
    /// `None` when the live stream is disabled.
    pub stream_status: Option<watch::Receiver<ConnectionStatus>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/feed", get(handlers::feed))
        .route("/api/v1/stats", get(handlers::stats))
        .route("/api/v1/analyze", post(handlers::analyze))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: tokio_util::sync::CancellationToken,
) -> eyre::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
