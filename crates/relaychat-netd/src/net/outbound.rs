use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Frames queued per connection before the sender is considered stalled.
/// `try_send` failure on a full queue deferred-disconnects that connection.
pub const OUTBOUND_QUEUE_FRAMES: usize = 1024;

/// Spawn a writer task that drains framed bytes to the TCP stream.
///
/// `write_all` absorbs partial writes, so a frame is either fully on the
/// socket or the task dies; frames are never interleaved or dropped. The
/// task exits when the outbound channel closes.
pub fn spawn_tcp_writer(
    mut write: tokio::net::tcp::OwnedWriteHalf,
    mut rx: mpsc::Receiver<bytes::Bytes>,
) -> tokio::task::JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            write.write_all(&frame).await?;
        }
        Ok(())
    })
}
