//! `Uplift` Agent
//!
//! Elevated helper spawned by `uplift` through the elevation front-end.
//! Not intended for direct invocation: it expects endpoints that only a
//! running coordinator provides.

use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "uplift-agent")]
#[command(version, about = "Internal elevated helper for uplift (not for direct use)")]
struct Args {
    /// Log level filter for the agent.
    #[arg(long, default_value = "info", env = "UPLIFT_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "UPLIFT_LOG_JSON")]
    log_json: bool,

    /// Session identifier followed by the serialized target command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    session_and_target: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!("uplift_agent={0},uplift_core={0}", args.log_level);
    uplift_core::tracing_init::init_tracing(&log_filter, args.log_json);

    #[cfg(unix)]
    info!(
        version = env!("CARGO_PKG_VERSION"),
        euid = %nix::unistd::geteuid(),
        "Starting uplift-agent"
    );
    #[cfg(not(unix))]
    info!(version = env!("CARGO_PKG_VERSION"), "Starting uplift-agent");

    match uplift_agent::runner::run(&args.session_and_target).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!(error = %e, "Agent aborted");
            Err(e.into())
        }
    }
}
