use crate::{error::ProtoError, msg_type::MsgType};

use super::{get_str, put_str, Message};

const CHAT_TEXT_LEN: usize = 256;

/// Delivery scope for a chat message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
    Group = 0,
    Private = 1,
}

impl ChatScope {
    /// Anything that is not explicitly private is treated as group chat.
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Private,
            _ => Self::Group,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Chat body: `chatType[1] fromId[32] fromNick[64] toId[32] timestamp[8] message[256]`.
///
/// `from_id` / `from_nick` are advisory on the way in; the server overwrites
/// them with the sender's bound identity before forwarding. A zero timestamp
/// asks the server to stamp the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub chat_type: u8,
    pub from_id: String,
    pub from_nick: String,
    pub to_id: String,
    pub timestamp: u64,
    pub message: String,
}

impl ChatMessage {
    pub const LEN: usize = 1 + 32 + 64 + 32 + 8 + CHAT_TEXT_LEN;

    pub fn scope(&self) -> ChatScope {
        ChatScope::from_u8(self.chat_type)
    }
}

impl Message for ChatMessage {
    const MSG_TYPE: MsgType = MsgType::ChatMsg;

    fn encode_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        out[0] = self.chat_type;
        put_str(&mut out[1..33], &self.from_id);
        put_str(&mut out[33..97], &self.from_nick);
        put_str(&mut out[97..129], &self.to_id);
        out[129..137].copy_from_slice(&self.timestamp.to_be_bytes());
        put_str(&mut out[137..393], &self.message);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < Self::LEN {
            return Err(ProtoError::TooShort);
        }
        let timestamp = u64::from_be_bytes(
            body[129..137]
                .try_into()
                .map_err(|_| ProtoError::TooShort)?,
        );
        Ok(Self {
            chat_type: body[0],
            from_id: get_str(&body[1..33]),
            from_nick: get_str(&body[33..97]),
            to_id: get_str(&body[97..129]),
            timestamp,
            message: get_str(&body[137..393]),
        })
    }
}
