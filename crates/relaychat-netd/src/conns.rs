//! The single owning table of live connections.
//!
//! All routing goes through connection ids and re-resolves against this map,
//! so a connection that got queued for disconnect mid-batch is simply no
//! longer sendable. Actual teardown waits for the connection task's
//! `Disconnected` event; `request_close` only flips the sticky flag and
//! signals the task.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use tracing::debug;

use crate::net::inbound::{CloseTx, ConnId, OutboundTx};

/// Per-connection server-side context.
pub struct ConnCtx {
    pub peer: SocketAddr,
    pub outbound: OutboundTx,
    pub close: CloseTx,
    pub closing: bool,
}

#[derive(Default)]
pub struct ConnTable {
    map: HashMap<ConnId, ConnCtx>,
}

impl ConnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, conn_id: ConnId, ctx: ConnCtx) {
        self.map.insert(conn_id, ctx);
    }

    pub fn remove(&mut self, conn_id: ConnId) -> Option<ConnCtx> {
        self.map.remove(&conn_id)
    }

    pub fn is_closing(&self, conn_id: ConnId) -> bool {
        self.map.get(&conn_id).map_or(true, |c| c.closing)
    }

    /// Queue a frame on a connection's outbound buffer.
    ///
    /// Returns false if the connection is gone, closing, or its outbound
    /// queue is stalled; a stalled queue deferred-disconnects the target
    /// (not the party that triggered the send).
    pub fn send(&mut self, conn_id: ConnId, frame: Bytes) -> bool {
        let Some(ctx) = self.map.get(&conn_id) else {
            return false;
        };
        if ctx.closing {
            return false;
        }

        if ctx.outbound.try_send(frame).is_err() {
            debug!(conn_id, "outbound queue stalled");
            self.request_close(conn_id, "send failed");
            return false;
        }
        true
    }

    /// Ask the connection task to shut down. Idempotent: the first request
    /// wins, later ones are no-ops.
    pub fn request_close(&mut self, conn_id: ConnId, reason: &str) {
        let Some(ctx) = self.map.get_mut(&conn_id) else {
            return;
        };
        if ctx.closing {
            return;
        }
        ctx.closing = true;
        debug!(conn_id, reason, "close requested");
        let _ = ctx.close.try_send(reason.to_string());
    }

    pub fn close_all(&mut self, reason: &str) {
        let ids: Vec<ConnId> = self.map.keys().copied().collect();
        for conn_id in ids {
            self.request_close(conn_id, reason);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
