use bytes::Bytes;
use relaychat_proto::codec::encode_frame;
use relaychat_proto::messages::file::extract_file_id;
use relaychat_proto::msg_type::MsgType;
use tracing::{debug, warn};

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::transfer::{RelayPeer, TransferTable};

/// Relay FILE_DATA / FILE_DATA_ACK verbatim to the session's other endpoint.
///
/// Only the `fileId` prefix is inspected; the body (chunk header plus
/// payload) passes through untouched, sequence included. The server never
/// generates acks of its own.
pub(crate) fn handle(
    conn_id: ConnId,
    kind: MsgType,
    frame: &FrameOwned,
    conns: &mut ConnTable,
    transfers: &TransferTable,
) {
    let Some(file_id) = extract_file_id(&frame.body) else {
        warn!(conn_id, ?kind, "file data without file id (dropped)");
        return;
    };

    match transfers.relay_peer(&file_id, conn_id) {
        RelayPeer::Peer(target) => {
            let bytes = encode_frame(kind, frame.header.sequence, &frame.body);
            conns.send(target, Bytes::from(bytes));
        }
        RelayPeer::Unassigned => {
            debug!(conn_id, file_id = %file_id, "relay target not ready (dropped)");
        }
        RelayPeer::NotParty => {
            warn!(conn_id, file_id = %file_id, "file data from non-participant (dropped)");
        }
        RelayPeer::UnknownFile => {
            debug!(conn_id, file_id = %file_id, "file data for unknown session (dropped)");
        }
    }
}
