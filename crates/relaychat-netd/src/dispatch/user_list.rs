use bytes::Bytes;
use relaychat_proto::codec::encode_message;
use relaychat_proto::messages::session::{UserInfo, UserListResponse};
use tracing::debug;

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::roster::Roster;

/// Reply with a snapshot of all online sessions, requester included,
/// echoing the requester's sequence.
pub(crate) fn handle(conn_id: ConnId, frame: &FrameOwned, conns: &mut ConnTable, roster: &Roster) {
    if roster.get(conn_id).map_or(true, |s| !s.online) {
        debug!(conn_id, "user list request before login (ignored)");
        return;
    }

    let users = roster
        .online_snapshot()
        .iter()
        .map(|s| UserInfo {
            client_id: s.client_id.clone(),
            nickname: s.nickname.clone(),
        })
        .collect();
    let rsp = UserListResponse { users };
    conns.send(
        conn_id,
        Bytes::from(encode_message(frame.header.sequence, &rsp)),
    );
}
