use crate::{constants::FILE_ID_LEN, error::ProtoError, msg_type::MsgType};

use super::{get_str, put_str, Message};

const FILE_NAME_LEN: usize = 256;
const OFFER_RSP_MESSAGE_LEN: usize = 64;

/// Result codes for `FileOfferResponse.result`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOfferResult {
    Accept = 0,
    Decline = 1,
    Busy = 2,
}

impl FileOfferResult {
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// File offer body:
/// `fileId[37] fromId[32] fromNick[64] toId[32] fileSize[8] fileName[256]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOffer {
    pub file_id: String,
    pub from_id: String,
    pub from_nick: String,
    pub to_id: String,
    pub file_size: u64,
    pub file_name: String,
}

impl FileOffer {
    pub const LEN: usize = FILE_ID_LEN + 32 + 64 + 32 + 8 + FILE_NAME_LEN;
}

impl Message for FileOffer {
    const MSG_TYPE: MsgType = MsgType::FileOffer;

    fn encode_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        put_str(&mut out[0..37], &self.file_id);
        put_str(&mut out[37..69], &self.from_id);
        put_str(&mut out[69..133], &self.from_nick);
        put_str(&mut out[133..165], &self.to_id);
        out[165..173].copy_from_slice(&self.file_size.to_be_bytes());
        put_str(&mut out[173..429], &self.file_name);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < Self::LEN {
            return Err(ProtoError::TooShort);
        }
        let file_size = u64::from_be_bytes(
            body[165..173]
                .try_into()
                .map_err(|_| ProtoError::TooShort)?,
        );
        Ok(Self {
            file_id: get_str(&body[0..37]),
            from_id: get_str(&body[37..69]),
            from_nick: get_str(&body[69..133]),
            to_id: get_str(&body[133..165]),
            file_size,
            file_name: get_str(&body[173..429]),
        })
    }
}

/// File offer response body: `fileId[37] result[4] message[64]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOfferResponse {
    pub file_id: String,
    pub result: u32,
    pub message: String,
}

impl FileOfferResponse {
    pub const LEN: usize = FILE_ID_LEN + 4 + OFFER_RSP_MESSAGE_LEN;

    pub fn new(file_id: &str, result: FileOfferResult, message: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            result: result.as_u32(),
            message: message.to_string(),
        }
    }
}

impl Message for FileOfferResponse {
    const MSG_TYPE: MsgType = MsgType::FileOfferRsp;

    fn encode_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        put_str(&mut out[0..37], &self.file_id);
        out[37..41].copy_from_slice(&self.result.to_be_bytes());
        put_str(&mut out[41..105], &self.message);
        out
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < Self::LEN {
            return Err(ProtoError::TooShort);
        }
        let result =
            u32::from_be_bytes(body[37..41].try_into().map_err(|_| ProtoError::TooShort)?);
        Ok(Self {
            file_id: get_str(&body[0..37]),
            result,
            message: get_str(&body[41..105]),
        })
    }
}

/// Leading header of a FILE_DATA / FILE_DATA_ACK body:
/// `fileId[37] offset[8] chunkSize[4]`. FILE_DATA carries `chunkSize` payload
/// bytes immediately after; an ack is the header alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDataHeader {
    pub file_id: String,
    pub offset: u64,
    pub chunk_size: u32,
}

impl FileDataHeader {
    pub const LEN: usize = FILE_ID_LEN + 8 + 4;

    pub fn encode_into(&self, out: &mut [u8]) {
        put_str(&mut out[0..37], &self.file_id);
        out[37..45].copy_from_slice(&self.offset.to_be_bytes());
        out[45..49].copy_from_slice(&self.chunk_size.to_be_bytes());
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtoError> {
        if body.len() < Self::LEN {
            return Err(ProtoError::TooShort);
        }
        let offset =
            u64::from_be_bytes(body[37..45].try_into().map_err(|_| ProtoError::TooShort)?);
        let chunk_size =
            u32::from_be_bytes(body[45..49].try_into().map_err(|_| ProtoError::TooShort)?);
        Ok(Self {
            file_id: get_str(&body[0..37]),
            offset,
            chunk_size,
        })
    }
}

/// Pull the `fileId` out of a FILE_DATA / FILE_DATA_ACK body without decoding
/// the rest. Returns `None` when the prefix is missing or blank.
pub fn extract_file_id(body: &[u8]) -> Option<String> {
    if body.len() < FILE_ID_LEN {
        return None;
    }
    let file_id = get_str(&body[..FILE_ID_LEN]);
    if file_id.is_empty() {
        return None;
    }
    Some(file_id)
}
