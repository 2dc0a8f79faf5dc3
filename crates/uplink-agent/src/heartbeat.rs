//! Heartbeat loop: wires the uplink client to host capabilities and runs
//! remediation commands for statuses the host can fix.
//!
//! Remediation runs on its own task so a slow `nmcli` or `chronyc` never
//! delays the next heartbeat. The queue holds one request; anything arriving
//! while it is full is dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uplink::{
    HeartbeatClient, HostProbe, HostTimeSync, NoTimeSync, StatusCode, SystemClock, TaskError,
    UplinkTaskConfig, UreqTransport, spawn_uplink,
};

use crate::command::exec_command;
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};

/// How long shutdown waits for an in-flight remediation command.
const REMEDIATION_GRACE: Duration = Duration::from_secs(5);

pub type HostClient = HeartbeatClient<HostProbe, SystemClock, HostTimeSync, UreqTransport>;

pub fn build_client(config: &AgentConfig, sync: HostTimeSync) -> HostClient {
    if let HostTimeSync::Command(cmd) = &sync
        && !cmd.is_available()
    {
        warn!(cmd = cmd.command(), "sh not found on PATH, time sync will fail");
    }
    HeartbeatClient::new(
        config.uplink.clone(),
        config.probe(),
        SystemClock,
        sync,
        UreqTransport::new(&config.transport()),
    )
}

/// Time sync the client runs inline on a cold start.
///
/// A looping agent leaves `sync_command` to `Resync` remediation, so one
/// `TIME_NOT_READY` never runs it twice.
fn client_time_sync(config: &AgentConfig, looping: bool) -> HostTimeSync {
    if looping {
        HostTimeSync::Disabled(NoTimeSync)
    } else {
        config.time_sync()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    Reconnect,
    Resync,
}

impl Remediation {
    pub fn for_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::NoNetwork => Some(Self::Reconnect),
            StatusCode::TimeNotReady => Some(Self::Resync),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct RemediationCommands {
    reconnect: Option<String>,
    resync: Option<String>,
}

impl RemediationCommands {
    fn from_config(config: &AgentConfig) -> Self {
        Self {
            reconnect: config.reconnect_command.clone(),
            resync: config.sync_command.clone(),
        }
    }

    fn command(&self, remediation: Remediation) -> Option<&str> {
        let cmd = match remediation {
            Remediation::Reconnect => self.reconnect.as_deref(),
            Remediation::Resync => self.resync.as_deref(),
        };
        cmd.filter(|c| !c.trim().is_empty())
    }
}

async fn remediation_loop(mut rx: mpsc::Receiver<Remediation>, commands: RemediationCommands) {
    while let Some(remediation) = rx.recv().await {
        let Some(cmd) = commands.command(remediation) else {
            debug!(?remediation, "no remediation command configured");
            continue;
        };
        info!(?remediation, cmd, "running remediation");
        match exec_command(cmd).await {
            Ok(_) => info!(?remediation, "remediation finished"),
            Err(e) => warn!(?remediation, error = %e, "remediation failed"),
        }
    }
}

fn log_status(status: StatusCode) {
    if status.is_ok() {
        info!("Heartbeat sent");
    } else {
        warn!(code = status.code(), name = status.name(), "Heartbeat failed: {status}");
    }
}

/// Log `status` and queue its remediation. A request arriving while one is
/// already queued is dropped.
fn on_status(tx: &mpsc::Sender<Remediation>, status: StatusCode) {
    log_status(status);
    if let Some(remediation) = Remediation::for_status(status)
        && tx.try_send(remediation).is_err()
    {
        debug!(?remediation, "remediation already pending");
    }
}

/// Send heartbeats every `interval` until Ctrl-C or SIGTERM.
pub async fn run(config: &AgentConfig, credentials: String, interval: Duration) -> AgentResult<()> {
    let client = build_client(config, client_time_sync(config, true));

    let (tx, rx) = mpsc::channel(1);
    let remediation = tokio::spawn(remediation_loop(
        rx,
        RemediationCommands::from_config(config),
    ));

    info!(
        endpoint = %config.uplink.endpoint,
        interval_secs = interval.as_secs(),
        "heartbeat started"
    );
    let handle = spawn_uplink(
        client,
        UplinkTaskConfig {
            credentials,
            interval,
        },
        move |status| on_status(&tx, status),
    );

    shutdown_signal().await;
    info!("shutting down");

    // Stopping drops the callback, which closes the remediation queue.
    handle.stop().await?;
    match tokio::time::timeout(REMEDIATION_GRACE, remediation).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "remediation task failed"),
        Err(_) => warn!("remediation still running at shutdown, abandoning it"),
    }

    info!("heartbeat stopped");
    Ok(())
}

/// Send a single heartbeat.
pub async fn send_once(config: &AgentConfig, credentials: String) -> AgentResult<StatusCode> {
    let mut client = build_client(config, client_time_sync(config, false));
    let status = tokio::task::spawn_blocking(move || client.send_heartbeat(&credentials))
        .await
        .map_err(|e| AgentError::Task(TaskError::Worker(e.to_string())))?;
    log_status(status);
    Ok(status)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_for_recoverable_statuses_only() {
        assert_eq!(
            Remediation::for_status(StatusCode::NoNetwork),
            Some(Remediation::Reconnect)
        );
        assert_eq!(
            Remediation::for_status(StatusCode::TimeNotReady),
            Some(Remediation::Resync)
        );
        for status in [
            StatusCode::Ok,
            StatusCode::ServerError,
            StatusCode::InvalidCredentials,
            StatusCode::InvalidDeviceId,
            StatusCode::InvalidToken,
            StatusCode::TransportError,
        ] {
            assert_eq!(Remediation::for_status(status), None, "{status:?}");
        }
    }

    #[test]
    fn commands_come_from_config() {
        let config = AgentConfig {
            sync_command: Some("chronyc makestep".into()),
            reconnect_command: Some("  ".into()),
            ..Default::default()
        };
        let commands = RemediationCommands::from_config(&config);
        assert_eq!(commands.command(Remediation::Resync), Some("chronyc makestep"));
        assert_eq!(commands.command(Remediation::Reconnect), None);
    }

    #[test]
    fn repeated_status_queues_one_remediation() {
        let (tx, mut rx) = mpsc::channel(1);
        on_status(&tx, StatusCode::TimeNotReady);
        on_status(&tx, StatusCode::TimeNotReady);

        assert_eq!(rx.try_recv().unwrap(), Remediation::Resync);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unrecoverable_statuses_queue_nothing() {
        let (tx, mut rx) = mpsc::channel(1);
        for status in [
            StatusCode::Ok,
            StatusCode::ServerError,
            StatusCode::TransportError,
            StatusCode::InvalidToken,
        ] {
            on_status(&tx, status);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn queue_frees_up_after_remediation_is_taken() {
        let (tx, mut rx) = mpsc::channel(1);
        on_status(&tx, StatusCode::NoNetwork);
        assert_eq!(rx.try_recv().unwrap(), Remediation::Reconnect);

        on_status(&tx, StatusCode::TimeNotReady);
        assert_eq!(rx.try_recv().unwrap(), Remediation::Resync);
    }

    #[test]
    fn looping_client_leaves_sync_to_remediation() {
        let config = AgentConfig {
            sync_command: Some("chronyc makestep".into()),
            ..Default::default()
        };
        assert!(matches!(
            client_time_sync(&config, true),
            HostTimeSync::Disabled(_)
        ));
        assert!(matches!(
            client_time_sync(&config, false),
            HostTimeSync::Command(_)
        ));
    }

    #[tokio::test]
    async fn remediation_loop_runs_configured_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("reconnected");
        let commands = RemediationCommands {
            reconnect: Some(format!("touch {}", marker.display())),
            resync: None,
        };

        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(remediation_loop(rx, commands));

        tx.send(Remediation::Resync).await.unwrap();
        tx.send(Remediation::Reconnect).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(marker.exists());
    }

    #[tokio::test]
    async fn remediation_loop_survives_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("synced");
        let commands = RemediationCommands {
            reconnect: Some("exit 1".into()),
            resync: Some(format!("touch {}", marker.display())),
        };

        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(remediation_loop(rx, commands));

        tx.send(Remediation::Reconnect).await.unwrap();
        tx.send(Remediation::Resync).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(marker.exists());
    }

    #[tokio::test]
    async fn send_once_without_network_reports_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            connectivity: crate::config::ConnectivityConfig {
                route_table: dir.path().join("missing-route"),
                ..Default::default()
            },
            ..Default::default()
        };

        let status = send_once(&config, "device-1234567890:secrettoken".into())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NoNetwork);
    }
}
