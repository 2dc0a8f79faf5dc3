//! Uplink agent: sends device heartbeats to Qrystal Uplink and nudges the
//! host (reconnect, time sync) when a heartbeat cannot go out.

mod command;
mod config;
mod error;
mod heartbeat;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use uplink::{Credentials, StatusCode};

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[derive(Parser)]
#[command(name = "uplink-agent", version)]
struct Cli {
    /// Path to agent config YAML
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    /// Device credentials as "<device_id>:<token>" (overrides the config file)
    #[arg(long, env = "UPLINK_CREDENTIALS", global = true, hide_env_values = true)]
    credentials: Option<String>,
    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send heartbeats periodically until interrupted
    Run(RunArgs),
    /// Send a single heartbeat; the exit code is the status code
    Send,
    /// Validate credentials without touching the network
    Check,
}

#[derive(Args)]
struct RunArgs {
    /// Seconds between heartbeats (overrides the config file)
    #[arg(long)]
    interval: Option<u64>,
}

/// Initialize tracing with a tee writer (stderr + rolling log file).
///
/// Returns the [`tracing_appender::non_blocking::WorkerGuard`] that must be
/// held alive until the process exits so buffered logs are flushed.
fn init_tracing_with_file(
    log_dir: &Path,
    level: Level,
) -> AgentResult<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("uplink-agent")
        .filename_suffix("log")
        .max_log_files(7)
        .build(log_dir)
        .map_err(|e| AgentError::Config(format!("log dir {}: {e}", log_dir.display())))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let writer = std::io::stderr.and(non_blocking);

    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_max_level(level)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn init_tracing_stderr(level: Level) {
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_credentials(cli: Option<String>, config: &AgentConfig) -> AgentResult<String> {
    cli.or_else(|| config.credentials.clone())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            AgentError::Config(
                "no credentials: pass --credentials, set UPLINK_CREDENTIALS, or add `credentials` to the config file"
                    .into(),
            )
        })
}

fn status_exit(status: StatusCode) -> ExitCode {
    ExitCode::from(status.code())
}

fn check(credentials: &str, config: &AgentConfig) -> StatusCode {
    let status = match Credentials::parse(credentials, &config.uplink) {
        Ok(creds) => {
            println!("device_id: {}", creds.device_id());
            println!("token: <{} chars>", creds.token().chars().count());
            StatusCode::Ok
        }
        Err(status) => status,
    };
    println!("status: {} ({}) {status}", status.code(), status.name());
    status
}

async fn run(cli: Cli) -> AgentResult<ExitCode> {
    let mut config = AgentConfig::load(cli.config.as_deref())?;
    let credentials = resolve_credentials(cli.credentials, &config)?;

    match cli.command {
        Command::Run(args) => {
            if let Some(secs) = args.interval {
                config.interval_secs = secs;
                config.validate()?;
            }
            heartbeat::run(&config, credentials, config.interval()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Send => {
            let status = heartbeat::send_once(&config, credentials).await?;
            println!("status: {} ({}) {status}", status.code(), status.name());
            Ok(status_exit(status))
        }
        Command::Check => Ok(status_exit(check(&credentials, &config))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let _guard = match &cli.log_dir {
        Some(dir) => match init_tracing_with_file(dir, level) {
            Ok(guard) => Some(guard),
            Err(e) => {
                init_tracing_stderr(level);
                tracing::warn!("file logging unavailable, using stderr only: {e}");
                None
            }
        },
        None => {
            init_tracing_stderr(level);
            None
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
