//! Relay pump: the read-then-write loop moving bytes between two streams.
//!
//! One pump owns one direction of one stream pair. Six of them exist per
//! session, three on each side of the elevation boundary, and they never
//! share buffers or handles, so the whole relay path is lock-free.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::debug;

/// Size of the per-pump transfer buffer. The two peers of a stream never
/// have to agree on it; each side reads and writes independently.
pub const BUFFER_SIZE: usize = 8 * 1024;

/// Forward bytes from `src` to `dst` until end-of-data, then shut the
/// destination down so the closure cascades. Returns the number of bytes
/// forwarded.
///
/// The loop alternates between exactly one outstanding read and one
/// outstanding write. A peer-closed condition on either leg is treated as
/// that leg's end-of-data and absorbed; it never surfaces to the caller.
pub async fn pump<R, W>(mut src: R, mut dst: W, label: &str) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut forwarded = 0u64;

    loop {
        let read = match src.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if is_disconnect(&e) => {
                debug!(label, error = %e, "Relay source closed by peer");
                break;
            }
            Err(e) => {
                debug!(label, error = %e, "Relay read failed, abandoning leg");
                break;
            }
        };

        // Flush per cycle: a line-buffered destination (the coordinator's
        // stdout) must not hold back a partial line of an interactive target.
        let written = async {
            dst.write_all(&buffer[..read]).await?;
            dst.flush().await
        };
        match written.await {
            Ok(()) => forwarded += read as u64,
            Err(e) => {
                debug!(label, error = %e, "Relay destination closed, abandoning leg");
                break;
            }
        }
    }

    // Propagate end-of-data downstream; the peer observes it as a zero read.
    if let Err(e) = dst.shutdown().await {
        debug!(label, error = %e, "Relay destination shutdown failed");
    }
    debug!(label, forwarded, "Relay pump finished");
    forwarded
}

/// Spawn a pump as its own task.
pub fn spawn_pump<R, W>(src: R, dst: W, label: &'static str) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move { pump(src, dst, label).await })
}

/// Whether an I/O error means the peer went away.
///
/// During best-effort relay teardown these are expected, not exceptional:
/// the far process exiting closes its ends while bytes may still be in
/// flight on ours.
pub fn is_disconnect(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    #[tokio::test]
    async fn forwards_bytes_in_order_regardless_of_chunking() {
        let (src_tx, src_rx) = duplex(16);
        let (dst_tx, mut dst_rx) = duplex(16);

        let handle = spawn_pump(src_rx, dst_tx, "test");

        // Deliberately odd chunk sizes around the internal buffer boundary.
        let payload: Vec<u8> = (0..=255u8).cycle().take(40_000).collect();
        let writer = tokio::spawn(async move {
            let mut src_tx = src_tx;
            for chunk in payload.chunks(7) {
                src_tx.write_all(chunk).await.unwrap();
            }
            drop(src_tx);
        });

        let mut received = Vec::new();
        dst_rx.read_to_end(&mut received).await.unwrap();
        writer.await.unwrap();

        let expected: Vec<u8> = (0..=255u8).cycle().take(40_000).collect();
        assert_eq!(received, expected);
        assert_eq!(handle.await.unwrap(), 40_000);
    }

    #[tokio::test]
    async fn closing_the_source_cascades_to_the_destination() {
        let (src_tx, src_rx) = duplex(16);
        let (dst_tx, mut dst_rx) = duplex(16);

        let handle = spawn_pump(src_rx, dst_tx, "test");
        drop(src_tx);

        // The destination observes closure as a plain zero read.
        let mut sink = Vec::new();
        dst_rx.read_to_end(&mut sink).await.unwrap();
        assert!(sink.is_empty());
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn destination_going_away_is_absorbed() {
        let (src_tx, src_rx) = duplex(16);
        let (dst_tx, dst_rx) = duplex(16);

        let handle = spawn_pump(src_rx, dst_tx, "test");
        drop(dst_rx);

        let mut src_tx = src_tx;
        // Writes may error once the pump's destination is gone; that must
        // starve this leg only, not panic the pump task.
        let _ = src_tx.write_all(&[1u8; 4096]).await;
        let _ = src_tx.write_all(&[2u8; 4096]).await;
        drop(src_tx);

        // The pump ends without propagating an error.
        handle.await.unwrap();
    }

    #[test]
    fn disconnect_kinds_are_recognized() {
        use std::io::{Error, ErrorKind};
        assert!(is_disconnect(&Error::from(ErrorKind::BrokenPipe)));
        assert!(is_disconnect(&Error::from(ErrorKind::ConnectionReset)));
        assert!(is_disconnect(&Error::from(ErrorKind::UnexpectedEof)));
        assert!(!is_disconnect(&Error::from(ErrorKind::PermissionDenied)));
    }
}
