//! Runs the target process on the elevated side of the boundary.
//!
//! The agent is handed `<session-id> <serialized target command>`. It
//! attaches to the three endpoints named from the identifier (they must
//! already exist -- the coordinator binds them before spawning us), starts
//! the target with fully captured standard streams, and pumps bytes until
//! the streams close. The agent's own exit status is the target's.

use std::process::Stdio;

use thiserror::Error;
use tokio::net::UnixStream;
use tokio::process::Command;
use tracing::info;

use uplift_core::endpoint::{self, SessionId, StreamRole};
use uplift_core::{cmdline, relay, status};

/// Errors from the agent's side of a session.
///
/// None of these are observable to the coordinator as anything richer
/// than an abnormal exit status; the process boundary carries no
/// structured errors.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The session identifier failed validation.
    #[error(transparent)]
    Core(#[from] uplift_core::Error),

    /// No target command followed the session identifier.
    #[error("No target command after the session identifier")]
    EmptyCommand,

    /// An endpoint was missing or refused the attachment.
    #[error("Failed to attach to the {role} endpoint: {source}")]
    Connect {
        role: StreamRole,
        #[source]
        source: std::io::Error,
    },

    /// The target could not be started with captured streams.
    #[error("Failed to spawn target: {reason}")]
    SpawnFailed { reason: String },

    /// I/O error while waiting on the target.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the agent for one session and return the status to exit with.
///
/// `args` is the raw argument vector after the program name: the session
/// identifier first, then the serialized target command (possibly already
/// split by the launching shell -- the pieces are recomposed before
/// tokenizing). An empty vector is a no-op.
pub async fn run(args: &[String]) -> Result<i32, AgentError> {
    let Some((raw_session, serialized)) = args.split_first() else {
        return Ok(0);
    };
    let session = SessionId::parse(raw_session)?;

    let target = cmdline::decode(&serialized.join(" "));
    let Some((program, target_args)) = target.split_first() else {
        return Err(AgentError::EmptyCommand);
    };
    info!(%session, program = %program, "Attaching to session endpoints");

    let output = attach(&session, StreamRole::Output).await?;
    let error = attach(&session, StreamRole::Error).await?;
    let input = attach(&session, StreamRole::Input).await?;

    let mut child = Command::new(program)
        .args(target_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AgentError::SpawnFailed {
            reason: e.to_string(),
        })?;

    let stdout = child.stdout.take().ok_or_else(|| AgentError::SpawnFailed {
        reason: "Failed to capture stdout".to_owned(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| AgentError::SpawnFailed {
        reason: "Failed to capture stderr".to_owned(),
    })?;
    let stdin = child.stdin.take().ok_or_else(|| AgentError::SpawnFailed {
        reason: "Failed to capture stdin".to_owned(),
    })?;

    let out_pump = relay::spawn_pump(stdout, output, "target-stdout");
    let err_pump = relay::spawn_pump(stderr, error, "target-stderr");
    let in_pump = relay::spawn_pump(input, stdin, "target-stdin");

    let exit = child.wait().await?;

    // The input leg may never reach end-of-data; the target is gone either
    // way. The outbound legs finish on their own at the target's EOF.
    in_pump.abort();
    let _ = out_pump.await;
    let _ = err_pump.await;

    let code = status::propagated_code(exit);
    info!(%session, code, "Target finished");
    Ok(code)
}

async fn attach(session: &SessionId, role: StreamRole) -> Result<UnixStream, AgentError> {
    endpoint::connect(session, role)
        .await
        .map_err(|e| match e {
            uplift_core::Error::Io(source) => AgentError::Connect { role, source },
            other => AgentError::Core(other),
        })
}
