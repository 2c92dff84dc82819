//! Session identifiers and the named endpoints they correlate.
//!
//! Endpoints are Unix domain sockets named `<prefix>.<session>.<role>.sock`
//! in the system temp directory. Both processes derive the path from the
//! session identifier alone, so no other channel is needed to agree on it.
//! Every endpoint has exactly one listener (the coordinator) and one
//! connector (the agent) for its whole lifetime.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::net::{UnixListener, UnixStream};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Fixed prefix of every endpoint name.
pub const ENDPOINT_PREFIX: &str = "uplift";

/// Which of the three standard streams an endpoint carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// Target stdout, flowing toward the caller.
    Output,
    /// Target stderr, flowing toward the caller.
    Error,
    /// Caller stdin, flowing toward the target.
    Input,
}

impl StreamRole {
    /// Stable name used in endpoint paths.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Error => "error",
            Self::Input => "input",
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlates one coordinator instance with its agent and their endpoints.
///
/// Generated fresh for every invocation so concurrent sessions on one host
/// cannot collide on endpoint names, and passed explicitly to everything
/// that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a unique identifier for a new session.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validate an identifier received on the agent side.
    ///
    /// The identifier becomes part of a filesystem path, so anything that
    /// could escape the endpoint namespace is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(Error::InvalidSessionId(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of one endpoint of a session.
pub fn socket_path(session: &SessionId, role: StreamRole) -> PathBuf {
    std::env::temp_dir().join(format!("{ENDPOINT_PREFIX}.{session}.{role}.sock"))
}

/// Listening end of an endpoint, bound by the coordinator before the agent
/// is spawned so the connector can never race a missing listener.
///
/// The socket file is unlinked again when the listener is dropped, including
/// on failure paths that never saw a connection.
#[derive(Debug)]
pub struct EndpointListener {
    path: PathBuf,
    listener: UnixListener,
}

impl EndpointListener {
    /// Bind the listening end for one role of a session.
    pub fn bind(session: &SessionId, role: StreamRole) -> Result<Self> {
        Self::bind_path(socket_path(session, role))
    }

    /// Bind on an explicit path, replacing a stale socket file if present.
    pub fn bind_path(path: PathBuf) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;
        debug!(path = %path.display(), "Endpoint listening");
        Ok(Self { path, listener })
    }

    /// Wait for the single peer of this endpoint to attach.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept().await?;
        debug!(path = %self.path.display(), "Endpoint peer attached");
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EndpointListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Attach to an endpoint as the connecting peer.
///
/// The listener is guaranteed to exist before the agent is spawned, so a
/// missing endpoint is an immediate failure, not something to retry.
pub async fn connect(session: &SessionId, role: StreamRole) -> Result<UnixStream> {
    let path = socket_path(session, role);
    let stream = UnixStream::connect(&path).await?;
    debug!(path = %path.display(), "Attached to endpoint");
    Ok(stream)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn role_names_are_stable() {
        assert_eq!(StreamRole::Output.as_str(), "output");
        assert_eq!(StreamRole::Error.as_str(), "error");
        assert_eq!(StreamRole::Input.as_str(), "input");
    }

    #[test]
    fn generated_identifiers_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn parse_rejects_identifiers_unfit_for_paths() {
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("a b").is_err());
        assert!(SessionId::parse("../escape").is_err());
        assert!(SessionId::parse("abc123").is_ok());
    }

    #[test]
    fn socket_paths_are_deterministic_per_session_and_role() {
        let session = SessionId::parse("feedbeef").unwrap();
        let path = socket_path(&session, StreamRole::Output);
        assert_eq!(path, socket_path(&session, StreamRole::Output));
        assert!(
            path.file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("uplift.feedbeef.output")
        );
    }

    #[tokio::test]
    async fn listener_and_connector_exchange_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uplift.test.output.sock");
        let listener = EndpointListener::bind_path(path.clone()).unwrap();

        let client = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&path).await.unwrap();
            stream.write_all(b"ping").await.unwrap();
        });

        let mut stream = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
        client.await.unwrap();
    }

    #[tokio::test]
    async fn stale_socket_file_is_replaced_on_bind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uplift.test.input.sock");
        std::fs::write(&path, b"stale").unwrap();
        let listener = EndpointListener::bind_path(path.clone()).unwrap();
        assert_eq!(listener.path(), path);
    }

    #[tokio::test]
    async fn dropping_the_listener_releases_the_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uplift.test.error.sock");
        let listener = EndpointListener::bind_path(path.clone()).unwrap();
        assert!(path.exists());
        drop(listener);
        assert!(!path.exists());
    }
}
