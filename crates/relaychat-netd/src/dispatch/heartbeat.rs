use bytes::Bytes;
use relaychat_proto::codec::encode_frame;
use relaychat_proto::msg_type::MsgType;
use tracing::warn;

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::roster::Roster;

/// Refresh the sender's liveness timestamp and echo the sequence back.
/// Valid for anonymous connections too.
pub(crate) fn handle(conn_id: ConnId, frame: &FrameOwned, conns: &mut ConnTable, roster: &mut Roster) {
    if !frame.body.is_empty() {
        warn!(
            conn_id,
            body_len = frame.body.len(),
            "heartbeat with non-empty body (ignored)"
        );
        return;
    }

    roster.touch_heartbeat(conn_id);

    let rsp = encode_frame(MsgType::HeartbeatRsp, frame.header.sequence, &[]);
    conns.send(conn_id, Bytes::from(rsp));
}
