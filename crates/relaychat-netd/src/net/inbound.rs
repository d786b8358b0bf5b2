use std::net::SocketAddr;
use tokio::sync::mpsc;

use super::framing::FrameOwned;

/// Unique connection identifier assigned by the server.
pub type ConnId = u64;

/// Sender used by upper layers to write bytes to this connection.
/// The payload is already framed and ready to write.
pub type OutboundTx = mpsc::Sender<bytes::Bytes>;

/// Signal used by upper layers to ask a connection task to shut down.
/// Carries a human-readable reason for the disconnect log.
pub type CloseTx = mpsc::Sender<String>;

/// Inbound events produced by the network layer.
///
/// - `Connected` is emitted once per accepted connection, with the handles
///   the dispatch loop uses to send bytes back and to request a close.
/// - `Frame` is emitted for every decoded frame, in arrival order.
/// - `Disconnected` is emitted when the connection task exits; only then may
///   per-connection state be torn down.
#[derive(Debug)]
pub enum InboundEvent {
    Connected {
        conn_id: ConnId,
        peer: SocketAddr,
        outbound: OutboundTx,
        close: CloseTx,
    },

    Frame {
        conn_id: ConnId,
        peer: SocketAddr,
        frame: FrameOwned,
    },

    Disconnected {
        conn_id: ConnId,
        peer: SocketAddr,
        /// Best-effort human-readable reason (logging/debug).
        reason: String,
    },
}
