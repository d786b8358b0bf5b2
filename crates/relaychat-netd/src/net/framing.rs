use bytes::{Buf, Bytes, BytesMut};
use relaychat_proto::codec::try_decode_frames;
use relaychat_proto::error::ProtoError;
use relaychat_proto::header::FrameHeader;
use relaychat_proto::msg_type::MsgType;

/// A single decoded frame that owns its body bytes.
/// Safe to move across tasks/channels.
#[derive(Debug, Clone)]
pub struct FrameOwned {
    pub header: FrameHeader,
    pub body: Bytes,
}

impl FrameOwned {
    pub fn kind(&self) -> Option<MsgType> {
        self.header.kind()
    }
}

/// Per-connection stream-to-frame assembly:
/// - keeps an internal receive accumulator (`BytesMut`)
/// - decodes as many frames as possible on each read
/// - keeps partial frames for the next read
///
/// On wire corruption the whole accumulator is discarded (the decode reports
/// which error tripped it, so callers can log) and assembly resumes with
/// whatever the peer sends next.
pub struct TcpFramer {
    buf: BytesMut,
}

impl TcpFramer {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(initial_capacity),
        }
    }

    /// Mutable access to the internal buffer for socket reads.
    ///
    /// Typical usage:
    /// - `framer.buf_mut().reserve(n)`
    /// - `socket.read_buf(framer.buf_mut()).await?`
    pub fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Decode all complete frames currently buffered.
    pub fn drain_frames(&mut self) -> (Vec<FrameOwned>, Option<ProtoError>) {
        let (views, consumed, err) = try_decode_frames(&self.buf);

        // Copy bodies out before advancing past them.
        let mut out = Vec::with_capacity(views.len());
        for v in views {
            out.push(FrameOwned {
                header: v.header,
                body: Bytes::copy_from_slice(v.body),
            });
        }
        self.buf.advance(consumed);

        (out, err)
    }
}

#[cfg(test)]
mod tests {
    use relaychat_proto::codec::{encode_frame, encode_message};
    use relaychat_proto::messages::session::{LoginRequest, UserListResponse, UserInfo};
    use relaychat_proto::msg_type::MsgType;

    use super::TcpFramer;

    fn sample_stream() -> Vec<u8> {
        let mut stream = encode_frame(MsgType::HeartbeatReq, 1, &[]);
        stream.extend_from_slice(&encode_message(
            2,
            &LoginRequest {
                client_id: "alice".to_string(),
                nickname: "Alice".to_string(),
            },
        ));
        stream.extend_from_slice(&encode_message(
            3,
            &UserListResponse {
                users: vec![UserInfo {
                    client_id: "alice".to_string(),
                    nickname: "Alice".to_string(),
                }],
            },
        ));
        stream
    }

    #[test]
    fn framer_decodes_one_frame() {
        let mut framer = TcpFramer::new(1024);
        let bytes = encode_frame(MsgType::HeartbeatReq, 9, &[]);
        framer.buf_mut().extend_from_slice(&bytes);

        let (frames, err) = framer.drain_frames();
        assert!(err.is_none());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind(), Some(MsgType::HeartbeatReq));
        assert_eq!(frames[0].header.sequence, 9);
    }

    #[test]
    fn arbitrary_chunking_yields_the_same_frames() {
        let stream = sample_stream();

        // Whole stream at once.
        let mut whole = TcpFramer::new(1024);
        whole.buf_mut().extend_from_slice(&stream);
        let (expected, err) = whole.drain_frames();
        assert!(err.is_none());
        assert_eq!(expected.len(), 3);

        // Byte by byte.
        let mut framer = TcpFramer::new(1024);
        let mut got = Vec::new();
        for b in &stream {
            framer.buf_mut().extend_from_slice(&[*b]);
            let (frames, err) = framer.drain_frames();
            assert!(err.is_none());
            got.extend(frames);
        }
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected.iter()) {
            assert_eq!(g.header, e.header);
            assert_eq!(g.body, e.body);
        }

        // Uneven chunks.
        let mut framer = TcpFramer::new(1024);
        let mut got = Vec::new();
        for chunk in stream.chunks(7) {
            framer.buf_mut().extend_from_slice(chunk);
            let (frames, _) = framer.drain_frames();
            got.extend(frames);
        }
        assert_eq!(got.len(), expected.len());
    }

    #[test]
    fn corruption_discards_accumulator_and_resyncs() {
        let mut framer = TcpFramer::new(1024);

        framer.buf_mut().extend_from_slice(&[0xDEu8; 48]);
        let (frames, err) = framer.drain_frames();
        assert!(frames.is_empty());
        assert!(err.is_some());
        assert!(framer.buf_mut().is_empty());

        // The connection keeps working once valid bytes arrive.
        let bytes = encode_frame(MsgType::HeartbeatReq, 5, &[]);
        framer.buf_mut().extend_from_slice(&bytes);
        let (frames, err) = framer.drain_frames();
        assert!(err.is_none());
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn corruption_takes_unread_valid_frames_with_it() {
        // Garbage buffered behind a partial header poisons everything that
        // arrives in the same drain, including a valid frame after it.
        let mut framer = TcpFramer::new(1024);
        let mut bytes = vec![0xEEu8; 20];
        bytes.extend_from_slice(&encode_frame(MsgType::HeartbeatReq, 6, &[]));
        framer.buf_mut().extend_from_slice(&bytes);

        let (frames, err) = framer.drain_frames();
        assert!(frames.is_empty());
        assert!(err.is_some());
        assert!(framer.buf_mut().is_empty());
    }
}
