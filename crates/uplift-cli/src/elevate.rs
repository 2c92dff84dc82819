//! Launching the agent through the OS elevation front-end.
//!
//! Elevation consent itself belongs to the front-end (`pkexec` by default);
//! this module only builds the invocation and classifies its reserved exit
//! statuses. The agent binary is expected next to the coordinator's own
//! executable unless configured otherwise.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use uplift_core::SessionId;

/// `pkexec`: the authorization dialog was dismissed.
pub const EXIT_DIALOG_DISMISSED: i32 = 126;
/// `pkexec`: the caller is not authorized (or the front-end itself failed).
pub const EXIT_NOT_AUTHORIZED: i32 = 127;

/// Name of the agent binary looked up beside the coordinator.
const AGENT_BIN_NAME: &str = "uplift-agent";

/// How the elevated helper gets launched.
#[derive(Debug, Clone)]
pub struct ElevationConfig {
    /// Elevation front-end program.
    pub elevator: PathBuf,
    /// Explicit agent binary; discovered beside the current executable
    /// when unset.
    pub agent_bin: Option<PathBuf>,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            elevator: PathBuf::from("pkexec"),
            agent_bin: None,
        }
    }
}

impl ElevationConfig {
    /// Resolve the agent binary to launch.
    pub fn resolve_agent_bin(&self) -> io::Result<PathBuf> {
        match &self.agent_bin {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_exe()?.with_file_name(AGENT_BIN_NAME)),
        }
    }

    /// Build the elevated invocation for one session.
    ///
    /// The target command crosses the boundary as a single serialized
    /// string; the agent tokenizes it back. The helper gets null stdio --
    /// relayed bytes travel only over the endpoints.
    pub fn command(&self, session: &SessionId, serialized_target: &str) -> io::Result<Command> {
        let agent_bin = self.resolve_agent_bin()?;
        let mut command = Command::new(&self.elevator);
        command
            .arg(agent_bin)
            .arg(session.as_str())
            .arg(serialized_target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(command)
    }
}

/// The front-end's own denial status, if that is what the exit was.
///
/// A target that happens to exit with one of the reserved statuses is
/// indistinguishable; the exit status is the only cross-boundary signal.
pub fn denied_status(status: ExitStatus) -> Option<i32> {
    match status.code() {
        Some(code @ (EXIT_DIALOG_DISMISSED | EXIT_NOT_AUTHORIZED)) => Some(code),
        _ => None,
    }
}
