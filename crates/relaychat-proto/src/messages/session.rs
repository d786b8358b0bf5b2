use crate::{error::ProtoError, msg_type::MsgType};

use super::{get_str, put_str, Message};

pub const CLIENT_ID_LEN: usize = 32;
pub const NICKNAME_LEN: usize = 64;
const LOGIN_MESSAGE_LEN: usize = 128;

/// Result codes for `LoginResponse.result`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Success = 0,
    InvalidParam = 1,
    ServerFull = 2,
    AlreadyOnline = 3,
    NicknameTaken = 4,
}

impl LoginResult {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Login request body: `clientId[32] nickname[64]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub client_id: String,
    pub nickname: String,
}

impl LoginRequest {
    pub const LEN: usize = CLIENT_ID_LEN + NICKNAME_LEN;
}

impl Message for LoginRequest {
    const MSG_TYPE: MsgType = MsgType::LoginReq;

    fn encode_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        put_str(&mut out[0..32], &self.client_id);
        put_str(&mut out[32..96], &self.nickname);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < Self::LEN {
            return Err(ProtoError::TooShort);
        }
        Ok(Self {
            client_id: get_str(&body[0..32]),
            nickname: get_str(&body[32..96]),
        })
    }
}

/// Login response body: `result[4] message[128]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub result: u32,
    pub message: String,
}

impl LoginResponse {
    pub const LEN: usize = 4 + LOGIN_MESSAGE_LEN;

    pub fn new(result: LoginResult, message: &str) -> Self {
        Self {
            result: result.as_u32(),
            message: message.to_string(),
        }
    }
}

impl Message for LoginResponse {
    const MSG_TYPE: MsgType = MsgType::LoginRsp;

    fn encode_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        out[0..4].copy_from_slice(&self.result.to_be_bytes());
        put_str(&mut out[4..132], &self.message);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < Self::LEN {
            return Err(ProtoError::TooShort);
        }
        let result = u32::from_be_bytes(body[0..4].try_into().map_err(|_| ProtoError::TooShort)?);
        Ok(Self {
            result,
            message: get_str(&body[4..132]),
        })
    }
}

/// One roster entry in a user-list response: `clientId[32] nickname[64]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub client_id: String,
    pub nickname: String,
}

impl UserInfo {
    pub const LEN: usize = CLIENT_ID_LEN + NICKNAME_LEN;

    fn encode_into(&self, out: &mut [u8]) {
        put_str(&mut out[0..32], &self.client_id);
        put_str(&mut out[32..96], &self.nickname);
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            client_id: get_str(&buf[0..32]),
            nickname: get_str(&buf[32..96]),
        }
    }
}

/// User-list response body: `count[4]` followed by `count` `UserInfo` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListResponse {
    pub users: Vec<UserInfo>,
}

impl Message for UserListResponse {
    const MSG_TYPE: MsgType = MsgType::UserListRsp;

    fn encode_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; 4 + self.users.len() * UserInfo::LEN];
        out[0..4].copy_from_slice(&(self.users.len() as u32).to_be_bytes());
        for (i, user) in self.users.iter().enumerate() {
            let start = 4 + i * UserInfo::LEN;
            user.encode_into(&mut out[start..start + UserInfo::LEN]);
        }
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < 4 {
            return Err(ProtoError::TooShort);
        }
        let count =
            u32::from_be_bytes(body[0..4].try_into().map_err(|_| ProtoError::TooShort)?) as usize;
        if body.len() < 4 + count * UserInfo::LEN {
            return Err(ProtoError::TooShort);
        }

        let mut users = Vec::with_capacity(count);
        for i in 0..count {
            let start = 4 + i * UserInfo::LEN;
            users.push(UserInfo::decode(&body[start..start + UserInfo::LEN]));
        }
        Ok(Self { users })
    }
}
