use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use relaychat_proto::constants::RX_BUFFER_LIMIT;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::warn;

use super::framing::TcpFramer;
use super::inbound::{ConnId, InboundEvent};
use super::outbound::{spawn_tcp_writer, OUTBOUND_QUEUE_FRAMES};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Start a TCP listener. All decoded frames and connection events are sent to `tx`.
pub async fn run_tcp_listener(
    bind: SocketAddr,
    tx: mpsc::Sender<InboundEvent>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    run_tcp_listener_with_listener(listener, tx).await
}

/// Accept loop over an already-bound listener.
/// Split out so tests (and embedders) can bind to port 0 themselves.
pub async fn run_tcp_listener_with_listener(
    listener: TcpListener,
    tx: mpsc::Sender<InboundEvent>,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);

        let tx_clone = tx.clone();
        tokio::spawn(async move {
            handle_tcp_connection(stream, peer, conn_id, tx_clone).await;
        });
    }
}

/// Handle a single TCP connection until EOF, error, or a requested close.
pub async fn handle_tcp_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn_id: ConnId,
    tx: mpsc::Sender<InboundEvent>,
) {
    let _ = stream.set_nodelay(true);

    // Split the stream so read/write can progress independently.
    let (mut read, write) = stream.into_split();

    // Outbound queue (framed bytes).
    let (out_tx, out_rx) = mpsc::channel::<bytes::Bytes>(OUTBOUND_QUEUE_FRAMES);
    let writer = spawn_tcp_writer(write, out_rx);

    // Close signal from the dispatch loop. Capacity 1: the request is sticky,
    // a second reason has nothing to add.
    let (close_tx, mut close_rx) = mpsc::channel::<String>(1);

    // Notify upper layer that a connection is established.
    tx.send(InboundEvent::Connected {
        conn_id,
        peer,
        outbound: out_tx.clone(),
        close: close_tx,
    })
    .await
    .ok();

    // Framer keeps bytes across reads.
    let mut framer = TcpFramer::new(8 * 1024);

    let mut disconnect_reason = "eof".to_string();

    loop {
        if framer.buf_mut().len() > RX_BUFFER_LIMIT {
            disconnect_reason = format!("rx buffer exceeded limit ({} bytes)", RX_BUFFER_LIMIT);
            break;
        }

        framer.buf_mut().reserve(4096);

        let n = tokio::select! {
            reason = close_rx.recv() => {
                disconnect_reason = reason.unwrap_or_else(|| "close requested".to_string());
                break;
            }
            res = read.read_buf(framer.buf_mut()) => match res {
                Ok(n) => n,
                Err(e) => {
                    disconnect_reason = format!("read error: {}", e);
                    break;
                }
            },
        };

        if n == 0 {
            disconnect_reason = "eof".to_string();
            break;
        }

        let (frames, corruption) = framer.drain_frames();
        if let Some(e) = corruption {
            // Lenient resync policy: the accumulator was discarded but the
            // connection stays open.
            warn!(conn_id, %peer, error = %e, "wire corruption, receive buffer discarded");
        }

        let mut closed = false;
        for frame in frames {
            if tx
                .send(InboundEvent::Frame {
                    conn_id,
                    peer,
                    frame,
                })
                .await
                .is_err()
            {
                // Upper layer is gone -> stop connection task.
                disconnect_reason = "inbound channel closed".to_string();
                closed = true;
                break;
            }
        }
        if closed {
            break;
        }
    }

    // Notify disconnect (best-effort).
    let _ = tx
        .send(InboundEvent::Disconnected {
            conn_id,
            peer,
            reason: disconnect_reason,
        })
        .await;

    // Close outbound channel so the writer can exit.
    drop(out_tx);

    // Await writer task; ignore errors here (connection is closing anyway).
    let _ = writer.await;
}
