use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::dashboard::SharedDashboard;
use crate::stream::connection::ConnectionStatus;

use super::generator::MockGenerator;

/// Demo feed: seeds the dashboard with `initial_count` rows, then pushes one
/// generated row per tick. Ticks are skipped while the live stream is connected.
pub async fn run_mock_feed<R: Rng + Send>(
    mut generator: MockGenerator<R>,
    dashboard: SharedDashboard,
    initial_count: usize,
    interval: Duration,
    live_status: Option<watch::Receiver<ConnectionStatus>>,
    shutdown: CancellationToken,
) {
    {
        let mut dash = dashboard.lock().await;
        for tx in generator.generate_initial_transactions(initial_count) {
            dash.push_mock(tx);
        }
    }
    tracing::info!(
        initial_count,
        interval_ms = interval.as_millis() as u64,
        "Mock feed active"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown received, stopping mock feed");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let live = live_status
            .as_ref()
            .is_some_and(|status| *status.borrow() == ConnectionStatus::Connected);
        if live {
            tracing::trace!("Live stream connected, skipping mock tick");
            continue;
        }

        let tx = generator.generate_transaction();
        tracing::debug!(
            id = %tx.id,
            risk_level = %tx.risk_level,
            risk_score = tx.risk_score,
            "Mock transaction generated"
        );
        dashboard.lock().await.push_mock(tx);
    }
}
