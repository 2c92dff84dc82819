//! Coordinator: the privileged-boundary driver on the caller's side.
//!
//! Allocates a fresh session, binds the three endpoints before anything can
//! try to connect to them, launches the agent through the elevation
//! front-end, wires the caller's real standard streams to the endpoints,
//! and finally becomes transparent to exit-status observers: the status of
//! `uplift` is the status of the target.

use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use uplift_core::endpoint::{EndpointListener, SessionId, StreamRole};
use uplift_core::{cmdline, relay, status};

use crate::elevate::{self, ElevationConfig};

/// How long teardown waits for the output/error legs to drain after the
/// elevated process has exited. The legs end on their own once the agent's
/// death closes the sockets; the guard only covers an agent that never
/// attached.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from driving an elevated session.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The elevation front-end refused to run the agent.
    #[error("Elevation request was denied (front-end status {status})")]
    ElevationDenied { status: i32 },

    /// The front-end itself could not be launched.
    #[error("Failed to launch elevation front-end: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// Endpoint setup failed.
    #[error(transparent)]
    Core(#[from] uplift_core::Error),

    /// I/O error while waiting on the elevated process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coordinator for elevated command execution.
pub struct Coordinator {
    elevation: ElevationConfig,
}

impl Coordinator {
    pub const fn new(elevation: ElevationConfig) -> Self {
        Self { elevation }
    }

    /// Run `command` elevated and return the exit status to propagate.
    ///
    /// An empty `command` is a no-op: no endpoint is created and nothing is
    /// spawned.
    pub async fn run(&self, command: &[String]) -> Result<i32, CoordinatorError> {
        if command.is_empty() {
            return Ok(0);
        }

        let session = SessionId::generate();
        info!(%session, program = %command[0], "Starting elevated session");

        // Listeners exist before the agent does, so the connector can never
        // race a missing endpoint.
        let output = EndpointListener::bind(&session, StreamRole::Output)?;
        let error = EndpointListener::bind(&session, StreamRole::Error)?;
        let input = EndpointListener::bind(&session, StreamRole::Input)?;

        let serialized = cmdline::encode(command);
        let mut child = self
            .elevation
            .command(&session, &serialized)
            .map_err(|source| CoordinatorError::Spawn { source })?
            .spawn()
            .map_err(|source| CoordinatorError::Spawn { source })?;

        // One task per leg; each owns its listener, so an aborted or
        // finished leg also releases its socket file.
        let out_pump = tokio::spawn(async move {
            match output.accept().await {
                Ok(stream) => relay::pump(stream, tokio::io::stdout(), "output").await,
                Err(e) => {
                    debug!(error = %e, "Output endpoint peer never attached");
                    0
                }
            }
        });
        let err_pump = tokio::spawn(async move {
            match error.accept().await {
                Ok(stream) => relay::pump(stream, tokio::io::stderr(), "error").await,
                Err(e) => {
                    debug!(error = %e, "Error endpoint peer never attached");
                    0
                }
            }
        });
        let in_pump = tokio::spawn(async move {
            match input.accept().await {
                Ok(stream) => relay::pump(tokio::io::stdin(), stream, "input").await,
                Err(e) => {
                    debug!(error = %e, "Input endpoint peer never attached");
                    0
                }
            }
        });

        let exit = child.wait().await?;

        // The caller's stdin may never reach end-of-data; the session is
        // over regardless.
        in_pump.abort();

        if let Some(denied) = elevate::denied_status(exit) {
            out_pump.abort();
            err_pump.abort();
            return Err(CoordinatorError::ElevationDenied { status: denied });
        }

        drain(out_pump, err_pump).await;

        let code = status::propagated_code(exit);
        info!(%session, code, "Elevated session finished");
        Ok(code)
    }
}

/// Let the output and error legs finish relaying whatever is still in
/// flight after the elevated process exited.
async fn drain(out_pump: JoinHandle<u64>, err_pump: JoinHandle<u64>) {
    let out_abort = out_pump.abort_handle();
    let err_abort = err_pump.abort_handle();
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        let _ = out_pump.await;
        let _ = err_pump.await;
    })
    .await;
    if drained.is_err() {
        debug!("Relay legs still open after drain timeout, abandoning them");
        out_abort.abort();
        err_abort.abort();
    }
}
