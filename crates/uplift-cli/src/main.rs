//! `Uplift` CLI
//!
//! Runs a target command with elevated privileges, bridging the three
//! standard streams back to the caller over named endpoints. The exit
//! status of `uplift` is the exit status of the target.

use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use uplift_cli::coordinator::{Coordinator, CoordinatorError};
use uplift_cli::elevate::ElevationConfig;

#[derive(Parser, Debug)]
#[command(name = "uplift")]
#[command(version, about = "Run a command elevated, with stdio bridged back to this terminal")]
struct Args {
    /// Elevation front-end used to launch the agent
    #[arg(long, default_value = "pkexec", env = "UPLIFT_ELEVATOR")]
    elevator: PathBuf,

    /// Agent binary (defaults to uplift-agent next to this executable)
    #[arg(long, env = "UPLIFT_AGENT_BIN")]
    agent_bin: Option<PathBuf>,

    /// Log level filter; stderr also carries the target's relayed stderr,
    /// so this stays quiet by default.
    #[arg(long, default_value = "warn", env = "UPLIFT_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "UPLIFT_LOG_JSON")]
    log_json: bool,

    /// Target command and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!("uplift_cli={0},uplift_core={0}", args.log_level);
    uplift_core::tracing_init::init_tracing(&log_filter, args.log_json);

    let coordinator = Coordinator::new(ElevationConfig {
        elevator: args.elevator,
        agent_bin: args.agent_bin,
    });

    match coordinator.run(&args.command).await {
        Ok(code) => std::process::exit(code),
        Err(CoordinatorError::ElevationDenied { status }) => {
            error!(status, "Elevation request was not granted");
            std::process::exit(status);
        }
        Err(e) => Err(e.into()),
    }
}
