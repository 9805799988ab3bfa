use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use risklens_feed::api::{self, AppState};
use risklens_feed::client::RiskClient;
use risklens_feed::config::Config;
use risklens_feed::dashboard::Dashboard;
use risklens_feed::mock::feed::run_mock_feed;
use risklens_feed::mock::MockGenerator;
use risklens_feed::stream::LiveStream;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for per-row events)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("RiskLens feed starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        backend = %config.backend.base_url,
        capacity = config.stream.capacity,
        "Configuration loaded from {}",
        config_path
    );

    let client = RiskClient::new(&config.backend)?;
    let dashboard = Dashboard::shared(config.stream.capacity);
    let shutdown = CancellationToken::new();

    // Live stream supersedes the mock feed while connected
    let live_stream = if config.stream.enabled {
        let url = config.backend.stream_url(&config.stream.path)?;
        tracing::info!(%url, "Opening live stream");
        Some(LiveStream::open(
            url,
            config.stream.reconnect.clone(),
            dashboard.clone(),
            &shutdown,
        ))
    } else {
        None
    };
    let live_status = live_stream.as_ref().map(|s| s.subscribe());

    let mut handles = Vec::new();

    if config.mock.enabled {
        let generator = MockGenerator::from_entropy(&config.mock);
        handles.push(tokio::spawn(run_mock_feed(
            generator,
            dashboard.clone(),
            config.mock.initial_count,
            Duration::from_millis(config.mock.interval_ms),
            live_status.clone(),
            shutdown.clone(),
        )));
    }

    if config.api.enabled {
        let state = AppState {
            dashboard: dashboard.clone(),
            client,
            stream_status: live_status,
        };
        let host = config.api.host.clone();
        let port = config.api.port;
        let api_shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = api::serve(state, &host, port, api_shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        }));
    }

    tracing::info!("RiskLens feed running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping feeds...");
    shutdown.cancel();

    if let Some(stream) = live_stream {
        stream.close().await;
    }
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("RiskLens feed stopped gracefully");
    Ok(())
}
