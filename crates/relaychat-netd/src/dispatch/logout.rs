use tracing::warn;

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;

/// A logout is just a client-initiated deferred disconnect; teardown and the
/// roster broadcast happen when the connection task reports back.
pub(crate) fn handle(conn_id: ConnId, frame: &FrameOwned, conns: &mut ConnTable) {
    if !frame.body.is_empty() {
        warn!(conn_id, body_len = frame.body.len(), "logout with non-empty body");
    }
    conns.request_close(conn_id, "logout");
}
