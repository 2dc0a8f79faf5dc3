use tokio::process::Command;
use tracing::trace;

/// Error from a failed shell command.
#[derive(Debug, thiserror::Error)]
#[error("command failed: {command}\n{detail}")]
pub struct CommandError {
    pub command: String,
    pub detail: String,
}

/// Execute an operator-configured shell command via `sh -c`.
///
/// Returns trimmed stdout on success.
pub async fn exec_command(cmd: &str) -> Result<String, CommandError> {
    trace!(cmd, "exec_command");

    let output = Command::new("sh")
        .args(["-c", cmd])
        .output()
        .await
        .map_err(|e| CommandError {
            command: cmd.to_string(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CommandError {
            command: cmd.to_string(),
            detail: stderr,
        })
    }
}
