use std::net::SocketAddr;

use bytes::Bytes;
use relaychat_proto::codec::encode_message;
use relaychat_proto::messages::session::{LoginRequest, LoginResponse, LoginResult};
use relaychat_proto::messages::Message;
use tracing::{info, warn};

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::roster::Roster;
use crate::ServerConfig;

use super::broadcast_user_list;

pub(crate) fn handle(
    conn_id: ConnId,
    peer: &SocketAddr,
    frame: &FrameOwned,
    conns: &mut ConnTable,
    roster: &mut Roster,
    config: &ServerConfig,
) {
    let sequence = frame.header.sequence;

    let req = match LoginRequest::decode_body(&frame.body) {
        Ok(req) => req,
        Err(e) => {
            warn!(conn_id, %peer, error = %e, "malformed login request");
            reply(conns, conn_id, sequence, LoginResult::InvalidParam, "Invalid parameters");
            return;
        }
    };

    if req.client_id.is_empty() || req.nickname.is_empty() {
        reply(conns, conn_id, sequence, LoginResult::InvalidParam, "Invalid parameters");
        return;
    }
    if roster.is_client_id_online(&req.client_id, conn_id) {
        reply(conns, conn_id, sequence, LoginResult::AlreadyOnline, "Client already online");
        return;
    }
    if roster.is_nickname_online(&req.nickname, conn_id) {
        reply(conns, conn_id, sequence, LoginResult::NicknameTaken, "Nickname taken");
        return;
    }
    if roster.online_count() >= config.max_clients {
        reply(conns, conn_id, sequence, LoginResult::ServerFull, "Server full");
        return;
    }
    if !roster.bind_identity(conn_id, &req.client_id, &req.nickname) {
        reply(conns, conn_id, sequence, LoginResult::InvalidParam, "Invalid parameters");
        return;
    }

    reply(conns, conn_id, sequence, LoginResult::Success, "OK");
    info!(
        conn_id,
        %peer,
        client_id = %req.client_id,
        nickname = %req.nickname,
        "login"
    );
    broadcast_user_list(conns, roster);
}

fn reply(conns: &mut ConnTable, conn_id: ConnId, sequence: u32, result: LoginResult, message: &str) {
    let rsp = LoginResponse::new(result, message);
    conns.send(conn_id, Bytes::from(encode_message(sequence, &rsp)));
}
