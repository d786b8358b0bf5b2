//! End-to-end integration tests for the relay server.
//!
//! Tests the full flow with mock clients:
//! - Login and identity uniqueness
//! - Group chat fan-out
//! - Private chat routing
//! - User list requests

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use relaychat_netd::net::tcp::run_tcp_listener_with_listener;
use relaychat_netd::{run_server, ServerConfig};
use relaychat_proto::codec::{encode_frame, encode_message, try_decode_frames};
use relaychat_proto::header::FrameHeader;
use relaychat_proto::messages::chat::{ChatMessage, ChatScope};
use relaychat_proto::messages::session::{LoginRequest, LoginResponse, LoginResult, UserListResponse};
use relaychat_proto::messages::Message;
use relaychat_proto::msg_type::MsgType;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn spawn_test_server(config: ServerConfig) -> (SocketAddr, mpsc::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let (event_tx, event_rx) = mpsc::channel(1024);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = run_tcp_listener_with_listener(listener, event_tx).await;
    });
    tokio::spawn(async move {
        let _ = run_server(event_rx, shutdown_rx, config).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (server_addr, shutdown_tx)
}

/// Mock test client.
struct TestClient {
    stream: TcpStream,
    buf: BytesMut,
    pending: VecDeque<(FrameHeader, Bytes)>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(4096),
            pending: VecDeque::new(),
        })
    }

    async fn send(&mut self, frame: Vec<u8>) -> anyhow::Result<()> {
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> anyhow::Result<(FrameHeader, Bytes)> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            self.buf.reserve(4096);
            let n = timeout(Duration::from_secs(2), self.stream.read_buf(&mut self.buf)).await??;
            if n == 0 {
                anyhow::bail!("connection closed by server");
            }

            let (views, consumed, err) = try_decode_frames(&self.buf);
            if let Some(e) = err {
                anyhow::bail!("protocol error: {}", e);
            }
            for v in views {
                self.pending
                    .push_back((v.header, Bytes::copy_from_slice(v.body)));
            }
            self.buf.advance(consumed);
        }
    }

    /// Read frames until one of the wanted type shows up, skipping
    /// broadcasts that happen to be interleaved.
    async fn recv_expect(&mut self, kind: MsgType) -> anyhow::Result<(FrameHeader, Bytes)> {
        loop {
            let (header, body) = self.recv_frame().await?;
            if header.kind() == Some(kind) {
                return Ok((header, body));
            }
        }
    }

    /// Assert that no frame of the given type arrives within `window`.
    async fn assert_no_frame_of(&mut self, kind: MsgType, window: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(());
            }
            match timeout(deadline - now, self.recv_frame()).await {
                Ok(Ok((header, _))) => {
                    if header.kind() == Some(kind) {
                        anyhow::bail!("unexpected {:?} frame", kind);
                    }
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(()),
            }
        }
    }

    async fn login(&mut self, client_id: &str, nickname: &str) -> anyhow::Result<LoginResponse> {
        let req = LoginRequest {
            client_id: client_id.to_string(),
            nickname: nickname.to_string(),
        };
        self.send(encode_message(1, &req)).await?;
        let (_, body) = self.recv_expect(MsgType::LoginRsp).await?;
        Ok(LoginResponse::decode_body(&body)?)
    }

    async fn send_group_chat(&mut self, sequence: u32, text: &str) -> anyhow::Result<()> {
        let msg = ChatMessage {
            chat_type: ChatScope::Group.as_u8(),
            from_id: "spoofed".to_string(),
            from_nick: "Spoofed".to_string(),
            to_id: String::new(),
            timestamp: 0,
            message: text.to_string(),
        };
        self.send(encode_message(sequence, &msg)).await
    }

    async fn send_private_chat(&mut self, to_id: &str, text: &str) -> anyhow::Result<()> {
        let msg = ChatMessage {
            chat_type: ChatScope::Private.as_u8(),
            from_id: String::new(),
            from_nick: String::new(),
            to_id: to_id.to_string(),
            timestamp: 7777,
            message: text.to_string(),
        };
        self.send(encode_message(2, &msg)).await
    }
}

#[tokio::test]
async fn login_uniqueness() -> anyhow::Result<()> {
    let (addr, _shutdown) = spawn_test_server(ServerConfig::default()).await;

    let mut a = TestClient::connect(addr).await?;
    let rsp = a.login("alice", "Alice").await?;
    assert_eq!(rsp.result, LoginResult::Success.as_u32());

    // Same client id, different nickname.
    let mut b = TestClient::connect(addr).await?;
    let rsp = b.login("alice", "Other").await?;
    assert_eq!(rsp.result, LoginResult::AlreadyOnline.as_u32());

    // Different client id, taken nickname.
    let mut c = TestClient::connect(addr).await?;
    let rsp = c.login("bob", "Alice").await?;
    assert_eq!(rsp.result, LoginResult::NicknameTaken.as_u32());

    // Empty fields.
    let mut d = TestClient::connect(addr).await?;
    let rsp = d.login("", "Empty").await?;
    assert_eq!(rsp.result, LoginResult::InvalidParam.as_u32());

    Ok(())
}

#[tokio::test]
async fn login_rejected_when_server_full() -> anyhow::Result<()> {
    let config = ServerConfig {
        max_clients: 1,
        ..ServerConfig::default()
    };
    let (addr, _shutdown) = spawn_test_server(config).await;

    let mut a = TestClient::connect(addr).await?;
    assert_eq!(
        a.login("alice", "Alice").await?.result,
        LoginResult::Success.as_u32()
    );

    let mut b = TestClient::connect(addr).await?;
    assert_eq!(
        b.login("bob", "Bob").await?.result,
        LoginResult::ServerFull.as_u32()
    );

    Ok(())
}

#[tokio::test]
async fn group_chat_fans_out_to_everyone_but_the_sender() -> anyhow::Result<()> {
    let (addr, _shutdown) = spawn_test_server(ServerConfig::default()).await;

    let mut a = TestClient::connect(addr).await?;
    let mut b = TestClient::connect(addr).await?;
    let mut c = TestClient::connect(addr).await?;
    a.login("alice", "Alice").await?;
    b.login("bob", "Bob").await?;
    c.login("carol", "Carol").await?;

    a.send_group_chat(42, "hi").await?;

    for peer in [&mut b, &mut c] {
        let (header, body) = peer.recv_expect(MsgType::ChatMsg).await?;
        let msg = ChatMessage::decode_body(&body)?;
        // Identity is server-validated, not whatever the sender claimed.
        assert_eq!(msg.from_id, "alice");
        assert_eq!(msg.from_nick, "Alice");
        assert_eq!(msg.message, "hi");
        assert_eq!(header.sequence, 42);
        // Zero timestamp was replaced by the server clock.
        assert!(msg.timestamp > 0);
    }

    // The sender is excluded from the fan-out.
    a.assert_no_frame_of(MsgType::ChatMsg, Duration::from_millis(300))
        .await?;

    Ok(())
}

#[tokio::test]
async fn private_chat_reaches_only_the_target() -> anyhow::Result<()> {
    let (addr, _shutdown) = spawn_test_server(ServerConfig::default()).await;

    let mut a = TestClient::connect(addr).await?;
    let mut b = TestClient::connect(addr).await?;
    let mut c = TestClient::connect(addr).await?;
    a.login("alice", "Alice").await?;
    b.login("bob", "Bob").await?;
    c.login("carol", "Carol").await?;

    a.send_private_chat("bob", "yo").await?;

    let (_, body) = b.recv_expect(MsgType::ChatMsg).await?;
    let msg = ChatMessage::decode_body(&body)?;
    assert_eq!(msg.from_id, "alice");
    assert_eq!(msg.to_id, "bob");
    assert_eq!(msg.message, "yo");
    // Non-zero sender timestamp is passed through untouched.
    assert_eq!(msg.timestamp, 7777);

    c.assert_no_frame_of(MsgType::ChatMsg, Duration::from_millis(300))
        .await?;

    // A private message to an unknown id is dropped silently.
    a.send_private_chat("nobody", "void").await?;
    b.assert_no_frame_of(MsgType::ChatMsg, Duration::from_millis(300))
        .await?;

    Ok(())
}

#[tokio::test]
async fn chat_before_login_is_ignored() -> anyhow::Result<()> {
    let (addr, _shutdown) = spawn_test_server(ServerConfig::default()).await;

    let mut anon = TestClient::connect(addr).await?;
    let mut a = TestClient::connect(addr).await?;
    a.login("alice", "Alice").await?;

    anon.send_group_chat(1, "pre-login").await?;
    a.assert_no_frame_of(MsgType::ChatMsg, Duration::from_millis(300))
        .await?;

    Ok(())
}

#[tokio::test]
async fn user_list_request_returns_the_full_roster() -> anyhow::Result<()> {
    let (addr, _shutdown) = spawn_test_server(ServerConfig::default()).await;

    let mut a = TestClient::connect(addr).await?;
    let mut b = TestClient::connect(addr).await?;
    a.login("alice", "Alice").await?;
    b.login("bob", "Bob").await?;

    a.send(encode_frame(MsgType::UserListReq, 99, &[])).await?;

    // Login broadcasts (sequence 0) may still be in flight; the sequenced
    // reply is the one answering this request.
    let body = loop {
        let (header, body) = a.recv_expect(MsgType::UserListRsp).await?;
        if header.sequence == 99 {
            break body;
        }
    };

    let rsp = UserListResponse::decode_body(&body)?;
    let mut ids: Vec<&str> = rsp.users.iter().map(|u| u.client_id.as_str()).collect();
    ids.sort_unstable();
    // The requester is part of its own snapshot.
    assert_eq!(ids, vec!["alice", "bob"]);

    Ok(())
}

#[tokio::test]
async fn logout_removes_the_client_and_refreshes_the_roster() -> anyhow::Result<()> {
    let (addr, _shutdown) = spawn_test_server(ServerConfig::default()).await;

    let mut a = TestClient::connect(addr).await?;
    let mut b = TestClient::connect(addr).await?;
    a.login("alice", "Alice").await?;
    b.login("bob", "Bob").await?;

    // Wait until A has seen the two-user roster, so the shrunken one below
    // can only come from the logout.
    loop {
        let (_, body) = a.recv_expect(MsgType::UserListRsp).await?;
        if UserListResponse::decode_body(&body)?.users.len() == 2 {
            break;
        }
    }

    b.send(encode_frame(MsgType::LogoutReq, 3, &[])).await?;

    // B's socket is closed by the server.
    let mut probe = [0u8; 1];
    let n = timeout(Duration::from_secs(2), b.stream.read(&mut probe)).await??;
    assert_eq!(n, 0, "expected EOF after logout");

    // A sees a roster without bob.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        assert!(tokio::time::Instant::now() < deadline, "no refreshed roster");
        let (_, body) = a.recv_expect(MsgType::UserListRsp).await?;
        let rsp = UserListResponse::decode_body(&body)?;
        let ids: Vec<&str> = rsp.users.iter().map(|u| u.client_id.as_str()).collect();
        if ids == vec!["alice"] {
            break;
        }
    }

    Ok(())
}
