//! Background uplink: sends a heartbeat every interval and reports each
//! status to a callback.
//!
//! The client is moved onto the blocking pool for each call and moved back
//! afterwards, so it is never shared. Stopping waits for an in-flight call
//! to finish and hands the client (with its state) back to the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::HeartbeatClient;
use crate::clock::{Clock, TimeSync};
use crate::network::ConnectivityProbe;
use crate::status::StatusCode;
use crate::transport::HttpsTransport;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct UplinkTaskConfig {
    /// `"<device_id>:<token>"`, passed unchanged on every tick.
    pub credentials: String,
    /// Time between heartbeats. The first one is sent immediately.
    pub interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("heartbeat worker failed: {0}")]
    Worker(String),
}

type TaskResult<P, C, S, T> = Result<HeartbeatClient<P, C, S, T>, TaskError>;

/// Handle to a running background uplink.
pub struct UplinkHandle<P, C, S, T> {
    shutdown: CancellationToken,
    join: JoinHandle<TaskResult<P, C, S, T>>,
}

impl<P, C, S, T> UplinkHandle<P, C, S, T> {
    /// Token that stops the task when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the task and wait for it, returning the client.
    pub async fn stop(self) -> TaskResult<P, C, S, T> {
        self.shutdown.cancel();
        self.wait().await
    }

    /// Wait for the task to end (after the token is cancelled elsewhere).
    pub async fn wait(self) -> TaskResult<P, C, S, T> {
        self.join
            .await
            .map_err(|e| TaskError::Worker(e.to_string()))?
    }
}

/// Start the uplink loop on the current tokio runtime.
pub fn spawn_uplink<P, C, S, T, F>(
    client: HeartbeatClient<P, C, S, T>,
    config: UplinkTaskConfig,
    on_status: F,
) -> UplinkHandle<P, C, S, T>
where
    P: ConnectivityProbe + Send + 'static,
    C: Clock + Send + 'static,
    S: TimeSync + Send + 'static,
    T: HttpsTransport + Send + 'static,
    F: FnMut(StatusCode) + Send + 'static,
{
    let shutdown = CancellationToken::new();
    let join = tokio::spawn(uplink_loop(client, config, on_status, shutdown.clone()));
    UplinkHandle { shutdown, join }
}

/// Run the uplink loop until `shutdown` is cancelled.
pub async fn uplink_loop<P, C, S, T, F>(
    mut client: HeartbeatClient<P, C, S, T>,
    config: UplinkTaskConfig,
    mut on_status: F,
    shutdown: CancellationToken,
) -> TaskResult<P, C, S, T>
where
    P: ConnectivityProbe + Send + 'static,
    C: Clock + Send + 'static,
    S: TimeSync + Send + 'static,
    T: HttpsTransport + Send + 'static,
    F: FnMut(StatusCode),
{
    let mut interval = tokio::time::interval(config.interval.max(MIN_INTERVAL));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let credentials: Arc<str> = Arc::from(config.credentials);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("uplink stopped");
                return Ok(client);
            }
            _ = interval.tick() => {
                let creds = Arc::clone(&credentials);
                let (returned, status) = tokio::task::spawn_blocking(move || {
                    let status = client.send_heartbeat(&creds);
                    (client, status)
                })
                .await
                .map_err(|e| TaskError::Worker(e.to_string()))?;
                client = returned;
                on_status(status);
            }
        }
    }
}
