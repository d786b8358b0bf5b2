use crate::{
    constants::{HEADER_LEN, MAGIC, MAX_BODY_LEN, VERSION},
    error::ProtoError,
    msg_type::MsgType,
};

/// Frame header (wire format).
///
/// Encoding rules:
/// - Fixed size: exactly `HEADER_LEN` bytes.
/// - Integer fields are big-endian.
/// - Layout is defined by `encode_into()` / `decode()` offsets below.
///
/// Decode rules:
/// - Requires `buf.len() >= HEADER_LEN`.
/// - Requires the magic number and version to match.
/// - Requires `body_len <= MAX_BODY_LEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type identifier. Kept raw so unknown types can be logged by
    /// upper layers instead of being rejected at the framing boundary.
    pub msg_type: u16,

    /// Body length in bytes, excluding the header.
    pub body_len: u32,

    /// Sender sequence number. This header implementation only stores it;
    /// responses echo the requester's value.
    pub sequence: u32,
}

impl FrameHeader {
    /// Header size in bytes for the current wire layout.
    pub const LEN: usize = HEADER_LEN;

    pub fn new(msg_type: MsgType, body_len: u32, sequence: u32) -> Self {
        Self {
            msg_type: msg_type.as_u16(),
            body_len,
            sequence,
        }
    }

    /// The parsed message type, or `None` for values outside the catalog.
    pub fn kind(&self) -> Option<MsgType> {
        MsgType::from_u16(self.msg_type)
    }

    /// Encode this header into `out` using the current fixed wire layout.
    ///
    /// Offsets (bytes):
    /// - 0..4   magic (u32 BE)
    /// - 4..6   version (u16 BE)
    /// - 6..8   msg_type (u16 BE)
    /// - 8..12  body_len (u32 BE)
    /// - 12..16 sequence (u32 BE)
    pub fn encode_into(&self, out: &mut [u8; HEADER_LEN]) {
        out[0..4].copy_from_slice(&MAGIC.to_be_bytes());
        out[4..6].copy_from_slice(&VERSION.to_be_bytes());
        out[6..8].copy_from_slice(&self.msg_type.to_be_bytes());
        out[8..12].copy_from_slice(&self.body_len.to_be_bytes());
        out[12..16].copy_from_slice(&self.sequence.to_be_bytes());
    }

    /// Decode and validate a header from the first `HEADER_LEN` bytes of `buf`.
    ///
    /// The body may not be buffered yet; callers compare `body_len` against
    /// what they have and wait for the rest.
    pub fn decode(buf: &[u8]) -> Result<FrameHeader, ProtoError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtoError::TooShort);
        }

        let magic = read_u32_be(buf, 0)?;
        if magic != MAGIC {
            return Err(ProtoError::BadMagic);
        }

        let version = read_u16_be(buf, 4)?;
        if version != VERSION {
            return Err(ProtoError::UnsupportedVersion(version));
        }

        let msg_type = read_u16_be(buf, 6)?;
        let body_len = read_u32_be(buf, 8)?;
        let sequence = read_u32_be(buf, 12)?;

        if body_len as usize > MAX_BODY_LEN {
            return Err(ProtoError::BodyTooLarge(body_len as usize));
        }

        Ok(FrameHeader {
            msg_type,
            body_len,
            sequence,
        })
    }
}

fn read_u32_be(buf: &[u8], start: usize) -> Result<u32, ProtoError> {
    let bytes: [u8; 4] = buf
        .get(start..start + 4)
        .ok_or(ProtoError::TooShort)?
        .try_into()
        .map_err(|_| ProtoError::TooShort)?;
    Ok(u32::from_be_bytes(bytes))
}

fn read_u16_be(buf: &[u8], start: usize) -> Result<u16, ProtoError> {
    let bytes: [u8; 2] = buf
        .get(start..start + 2)
        .ok_or(ProtoError::TooShort)?
        .try_into()
        .map_err(|_| ProtoError::TooShort)?;
    Ok(u16::from_be_bytes(bytes))
}
