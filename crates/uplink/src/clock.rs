//! Clock and time-sync capabilities.

use std::process::Command;

use tracing::trace;

/// Wall-clock source in epoch seconds.
pub trait Clock {
    fn now(&self) -> i64;
}

impl<F> Clock for F
where
    F: Fn() -> i64,
{
    fn now(&self) -> i64 {
        self()
    }
}

/// System UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Error from a time-sync attempt. Never escalated by the heartbeat client.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("time sync unavailable")]
    Unavailable,

    #[error("sync command failed: {command}\n{detail}")]
    Command { command: String, detail: String },
}

/// Best-effort trigger that asks the host to synchronize its clock.
pub trait TimeSync {
    fn try_sync(&self) -> Result<(), SyncError>;
}

/// No sync mechanism; every attempt reports [`SyncError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimeSync;

impl TimeSync for NoTimeSync {
    fn try_sync(&self) -> Result<(), SyncError> {
        Err(SyncError::Unavailable)
    }
}

/// Runs a shell command such as `chronyc makestep` or `ntpdate -u pool.ntp.org`.
///
/// The command string comes from the operator's config file and is passed to
/// `sh -c` verbatim.
#[derive(Debug, Clone)]
pub struct CommandTimeSync {
    command: String,
}

impl CommandTimeSync {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether `sh` can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which("sh").is_ok()
    }
}

impl TimeSync for CommandTimeSync {
    fn try_sync(&self) -> Result<(), SyncError> {
        trace!(cmd = %self.command, "time sync");

        let output = Command::new("sh")
            .args(["-c", &self.command])
            .output()
            .map_err(|e| SyncError::Command {
                command: self.command.clone(),
                detail: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(SyncError::Command {
                command: self.command.clone(),
                detail: stderr,
            })
        }
    }
}

/// Either a configured command or nothing.
#[derive(Debug, Clone)]
pub enum HostTimeSync {
    Command(CommandTimeSync),
    Disabled(NoTimeSync),
}

impl HostTimeSync {
    pub fn from_command(command: Option<&str>) -> Self {
        match command {
            Some(cmd) if !cmd.trim().is_empty() => Self::Command(CommandTimeSync::new(cmd)),
            _ => Self::Disabled(NoTimeSync),
        }
    }
}

impl TimeSync for HostTimeSync {
    fn try_sync(&self) -> Result<(), SyncError> {
        match self {
            Self::Command(sync) => sync.try_sync(),
            Self::Disabled(sync) => sync.try_sync(),
        }
    }
}
