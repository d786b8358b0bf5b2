//! Relay server library - dispatch loop logic extracted for testing.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::conns::{ConnCtx, ConnTable};
use crate::dispatch::{broadcast_user_list, dispatch_frame};
use crate::net::inbound::InboundEvent;
use crate::roster::Roster;
use crate::transfer::TransferTable;

// Export modules publicly for testing
pub mod conns;
pub mod dispatch;
pub mod net;
pub mod roster;
pub mod transfer;

/// Tunables for the dispatch loop. Integration tests shrink the heartbeat
/// timings to keep the suites fast.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Online cap; logins past it are rejected with SERVER_FULL.
    pub max_clients: usize,
    /// How often the liveness sweep runs.
    pub heartbeat_interval: Duration,
    /// Silence threshold after which a connection is reaped.
    pub heartbeat_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: 1024,
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(10),
        }
    }
}

/// Run the dispatch loop.
///
/// This is the core server logic, extracted for testability. One task owns
/// every piece of mutable state; network tasks only talk to it through `rx`.
/// Returns after a shutdown signal or when the event channel closes.
pub async fn run_server(
    mut rx: mpsc::Receiver<InboundEvent>,
    mut shutdown: mpsc::Receiver<()>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let mut conns = ConnTable::new();
    let mut roster = Roster::new();
    let mut transfers = TransferTable::new();

    let mut sweep = tokio::time::interval(config.heartbeat_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; swallow it so the sweep cadence
    // starts one interval from now.
    sweep.tick().await;

    info!("dispatch loop started");

    loop {
        tokio::select! {
            ev = rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    InboundEvent::Connected { conn_id, peer, outbound, close } => {
                        conns.insert(conn_id, ConnCtx {
                            peer,
                            outbound,
                            close,
                            closing: false,
                        });
                        roster.add(conn_id, peer);
                        debug!(conn_id, %peer, "client connected");
                    }

                    InboundEvent::Disconnected { conn_id, peer, reason } => {
                        if conns.remove(conn_id).is_none() {
                            continue;
                        }
                        roster.remove(conn_id);
                        let reclaimed = transfers.remove_for_conn(conn_id);
                        if reclaimed > 0 {
                            debug!(conn_id, reclaimed, "file sessions reclaimed");
                        }
                        info!(conn_id, %peer, %reason, "client disconnected");
                        broadcast_user_list(&mut conns, &roster);
                    }

                    InboundEvent::Frame { conn_id, peer, frame } => {
                        // A connection queued for disconnect gets no further
                        // dispatch, even for frames that were already in flight.
                        if conns.is_closing(conn_id) {
                            continue;
                        }
                        dispatch_frame(
                            conn_id,
                            &peer,
                            &frame,
                            &mut conns,
                            &mut roster,
                            &mut transfers,
                            &config,
                        );
                    }
                }
            }

            _ = sweep.tick() => {
                for conn_id in roster.timed_out(config.heartbeat_timeout) {
                    warn!(conn_id, "heartbeat timeout");
                    conns.request_close(conn_id, "heartbeat timeout");
                }
                info!(
                    online = roster.online_count(),
                    connections = conns.len(),
                    file_sessions = transfers.len(),
                    "status"
                );
            }

            _ = shutdown.recv() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    // Final cleanup: every remaining connection task is asked to exit. Their
    // disconnect events die with this loop, which also suppresses the
    // post-teardown roster broadcast during shutdown.
    conns.close_all("server shutdown");
    info!("dispatch loop stopped");
    Ok(())
}
