use futures::StreamExt;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::wire::StreamEvent;
use crate::config::ReconnectConfig;
use crate::dashboard::SharedDashboard;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Exponential backoff: doubles from `initial`, capped at `max`, at most
/// `max_retries` consecutive delays before giving up.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    max_retries: u32,
    next: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        let initial = Duration::from_millis(config.initial_delay_ms);
        Self {
            initial,
            max: Duration::from_millis(config.max_delay_ms),
            max_retries: config.max_retries,
            next: initial,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_retries {
            return None;
        }
        self.attempts += 1;
        let delay = std::cmp::min(self.next, self.max);
        self.next = std::cmp::min(self.next * 2, self.max);
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Owned connection to the live risk stream.
///
/// The socket lives inside a spawned task. Status is published by that task
/// only, so it always reflects the real socket. `close()` (or drop) cancels
/// the task; nothing reaches the dashboard after cancellation.
pub struct LiveStream {
    status: watch::Receiver<ConnectionStatus>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LiveStream {
    pub fn open(
        url: reqwest::Url,
        reconnect: ReconnectConfig,
        dashboard: SharedDashboard,
        parent: &CancellationToken,
    ) -> Self {
        let shutdown = parent.child_token();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let task = tokio::spawn(run_stream(
            url,
            Backoff::new(&reconnect),
            dashboard,
            status_tx,
            shutdown.clone(),
        ));
        Self {
            status: status_rx,
            shutdown,
            task: Some(task),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// False once the connection task has ended (closed or out of retries).
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Live stream task failed");
            }
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum StreamEnd {
    Cancelled,
    Closed,
    Failed(String),
}

async fn run_stream(
    url: reqwest::Url,
    mut backoff: Backoff,
    dashboard: SharedDashboard,
    status: watch::Sender<ConnectionStatus>,
    shutdown: CancellationToken,
) {
    loop {
        status.send_replace(ConnectionStatus::Connecting);

        let connected = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
        };

        match connected {
            Ok((socket, _)) => {
                status.send_replace(ConnectionStatus::Connected);
                tracing::info!(%url, "Live stream connected");

                let (end, delivered) = ingest(socket, &dashboard, &shutdown).await;
                status.send_replace(ConnectionStatus::Disconnected);
                // A server that accepts and hangs up at once must still use
                // up the retry budget.
                if delivered > 0 {
                    backoff.reset();
                }
                match end {
                    StreamEnd::Cancelled => break,
                    StreamEnd::Closed => tracing::warn!(%url, "Live stream closed by server"),
                    StreamEnd::Failed(e) => tracing::warn!(%url, error = %e, "Live stream dropped"),
                }
            }
            Err(e) => {
                status.send_replace(ConnectionStatus::Disconnected);
                tracing::warn!(%url, error = %e, "Live stream connection failed");
            }
        }

        let Some(delay) = backoff.next_delay() else {
            tracing::error!(
                %url,
                attempts = backoff.attempts(),
                "Live stream retry budget exhausted, staying offline"
            );
            break;
        };
        tracing::info!(
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Reconnecting live stream"
        );

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    status.send_replace(ConnectionStatus::Disconnected);
    tracing::info!("Live stream stopped");
}

/// Read frames one at a time, in arrival order, until the socket ends or
/// shutdown fires. Cancellation wins over a ready frame. Also returns how
/// many rows reached the dashboard.
async fn ingest(
    mut socket: Socket,
    dashboard: &SharedDashboard,
    shutdown: &CancellationToken,
) -> (StreamEnd, usize) {
    let mut delivered = 0;
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                if tokio::time::timeout(CLOSE_TIMEOUT, socket.close(None)).await.is_err() {
                    tracing::debug!("Timed out sending close frame");
                }
                return (StreamEnd::Cancelled, delivered);
            }
            frame = socket.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if deliver(text.as_str(), dashboard, shutdown).await {
                    delivered += 1;
                }
            }
            Some(Ok(Message::Close(_))) | None => return (StreamEnd::Closed, delivered),
            Some(Ok(_)) => {}
            Some(Err(e)) => return (StreamEnd::Failed(e.to_string()), delivered),
        }
    }
}

async fn deliver(text: &str, dashboard: &SharedDashboard, shutdown: &CancellationToken) -> bool {
    let event: StreamEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable stream frame");
            return false;
        }
    };
    let live = match event.into_live(local_row_id()) {
        Ok(live) => live,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping stream frame");
            return false;
        }
    };
    if live.risk_level.is_none() {
        tracing::debug!(risk = %live.risk_label, "Stream frame has an unrecognised risk label");
    }

    let mut dash = dashboard.lock().await;
    if shutdown.is_cancelled() {
        return false;
    }
    tracing::debug!(
        id = %live.id,
        merchant = %live.merchant,
        risk = %live.risk_label,
        "Live transaction received"
    );
    dash.push_live(live);
    true
}

/// List key for a streamed row. Collisions across reconnects are harmless.
fn local_row_id() -> String {
    let bytes: [u8; 3] = rand::thread_rng().gen();
    hex::encode(bytes)
}
