use crate::{
    constants::HEADER_LEN,
    error::ProtoError,
    header::FrameHeader,
    messages::Message,
    msg_type::MsgType,
};

/// A decoded frame borrowing its body from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub header: FrameHeader,
    pub body: &'a [u8],
}

/// Encode a complete frame from a raw body.
///
/// This is the relay path: the body is passed through untouched, only the
/// header is (re)built around it.
pub fn encode_frame(msg_type: MsgType, sequence: u32, body: &[u8]) -> Vec<u8> {
    let header = FrameHeader::new(msg_type, body.len() as u32, sequence);

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    let mut hbuf = [0u8; HEADER_LEN];
    header.encode_into(&mut hbuf);
    out.extend_from_slice(&hbuf);
    out.extend_from_slice(body);
    out
}

/// Encode a typed message into a complete frame.
///
/// The frame type is taken from the message type's `MSG_TYPE` binding.
pub fn encode_message<M: Message>(sequence: u32, msg: &M) -> Vec<u8> {
    encode_frame(M::MSG_TYPE, sequence, &msg.encode_body())
}

/// Decode as many complete frames as possible from `in_buf`.
///
/// Returns the decoded frames, the number of bytes consumed, and the header
/// error if the stream turned out to be corrupted. On corruption the entire
/// input counts as consumed: the resync policy is to discard whatever has
/// accumulated and wait for the next write from the peer, never to hunt for
/// a header mid-stream. Frames decoded before the bad header are still
/// returned. The connection itself stays usable.
pub fn try_decode_frames(in_buf: &[u8]) -> (Vec<FrameView<'_>>, usize, Option<ProtoError>) {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    loop {
        if in_buf.len() - offset < HEADER_LEN {
            break;
        }

        let header = match FrameHeader::decode(&in_buf[offset..]) {
            Ok(h) => h,
            Err(e) => return (frames, in_buf.len(), Some(e)),
        };

        let total = HEADER_LEN + header.body_len as usize;
        if in_buf.len() - offset < total {
            break;
        }

        frames.push(FrameView {
            header,
            body: &in_buf[offset + HEADER_LEN..offset + total],
        });
        offset += total;
    }

    (frames, offset, None)
}
