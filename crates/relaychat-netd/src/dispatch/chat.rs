use bytes::Bytes;
use relaychat_proto::codec::encode_message;
use relaychat_proto::messages::chat::{ChatMessage, ChatScope};
use relaychat_proto::messages::Message;
use tracing::{debug, warn};

use crate::conns::ConnTable;
use crate::net::framing::FrameOwned;
use crate::net::inbound::ConnId;
use crate::roster::Roster;

use super::epoch_seconds;

/// Forward a chat message, group or private.
///
/// The sender's identity fields are never trusted: the forwarded frame
/// carries the roster-bound `client_id`/`nickname` of the connection the
/// frame arrived on. A zero timestamp is replaced with the server clock.
pub(crate) fn handle(conn_id: ConnId, frame: &FrameOwned, conns: &mut ConnTable, roster: &Roster) {
    let msg = match ChatMessage::decode_body(&frame.body) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(conn_id, error = %e, "malformed chat message");
            return;
        }
    };

    let Some(sender) = roster.get(conn_id).filter(|s| s.online) else {
        warn!(conn_id, "chat from connection without a session (ignored)");
        return;
    };

    let scope = msg.scope();
    let timestamp = if msg.timestamp == 0 {
        epoch_seconds()
    } else {
        msg.timestamp
    };

    let forwarded = ChatMessage {
        chat_type: scope.as_u8(),
        from_id: sender.client_id.clone(),
        from_nick: sender.nickname.clone(),
        to_id: msg.to_id.clone(),
        timestamp,
        message: msg.message,
    };
    let bytes = Bytes::from(encode_message(frame.header.sequence, &forwarded));

    match scope {
        ChatScope::Group => {
            for session in roster.online_snapshot() {
                if session.conn_id != conn_id {
                    conns.send(session.conn_id, bytes.clone());
                }
            }
        }
        ChatScope::Private => {
            if msg.to_id.is_empty() {
                debug!(conn_id, "private chat without target (dropped)");
                return;
            }
            match roster.conn_by_client_id(&msg.to_id) {
                Some(target) => {
                    conns.send(target, bytes);
                }
                None => {
                    // Target offline: dropped silently, the sender sees nothing.
                    debug!(conn_id, to_id = %msg.to_id, "private chat target offline");
                }
            }
        }
    }
}
