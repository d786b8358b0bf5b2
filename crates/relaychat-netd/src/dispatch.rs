//! Frame dispatch: one handler module per message type.
//!
//! Handlers never block and never touch sockets; they queue frames on zero
//! or more targets through the connection table and mutate the roster and
//! transfer table. Everything runs on the dispatch loop task.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use relaychat_proto::codec::encode_message;
use relaychat_proto::messages::session::{UserInfo, UserListResponse};
use relaychat_proto::msg_type::MsgType;
use tracing::warn;

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::roster::Roster;
use crate::transfer::TransferTable;
use crate::ServerConfig;

mod chat;
mod file_data;
mod file_offer;
mod file_offer_rsp;
mod heartbeat;
mod login;
mod logout;
mod user_list;

pub fn dispatch_frame(
    conn_id: ConnId,
    peer: &SocketAddr,
    frame: &FrameOwned,
    conns: &mut ConnTable,
    roster: &mut Roster,
    transfers: &mut TransferTable,
    config: &ServerConfig,
) {
    let Some(kind) = frame.kind() else {
        warn!(
            conn_id,
            %peer,
            msg_type = frame.header.msg_type,
            body_len = frame.body.len(),
            "unknown message type (ignored)"
        );
        return;
    };

    match kind {
        MsgType::HeartbeatReq => heartbeat::handle(conn_id, frame, conns, roster),
        MsgType::LoginReq => login::handle(conn_id, peer, frame, conns, roster, config),
        MsgType::LogoutReq => logout::handle(conn_id, frame, conns),
        MsgType::ChatMsg => chat::handle(conn_id, frame, conns, roster),
        MsgType::UserListReq => user_list::handle(conn_id, frame, conns, roster),
        MsgType::FileOffer => file_offer::handle(conn_id, frame, conns, roster, transfers),
        MsgType::FileOfferRsp => file_offer_rsp::handle(conn_id, frame, conns, transfers),
        MsgType::FileData | MsgType::FileDataAck => {
            file_data::handle(conn_id, kind, frame, conns, transfers)
        }
        MsgType::HeartbeatRsp | MsgType::LoginRsp | MsgType::UserListRsp => {
            warn!(conn_id, %peer, ?kind, "server-bound response from client (ignored)");
        }
    }
}

/// Push a fresh user list to every online session.
/// Server-originated frames carry sequence 0.
pub fn broadcast_user_list(conns: &mut ConnTable, roster: &Roster) {
    let sessions = roster.online_snapshot();
    if sessions.is_empty() {
        return;
    }

    let users = sessions
        .iter()
        .map(|s| UserInfo {
            client_id: s.client_id.clone(),
            nickname: s.nickname.clone(),
        })
        .collect();
    let frame = Bytes::from(encode_message(0, &UserListResponse { users }));

    for session in &sessions {
        conns.send(session.conn_id, frame.clone());
    }
}

pub(crate) fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
