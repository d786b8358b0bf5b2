//! Async TCP client for the relay protocol.
//!
//! This module handles:
//! - Connection to the server
//! - Frame assembly and encoding/decoding (same code path as the server)
//! - Async send/receive loops and the periodic heartbeat

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use relaychat_proto::codec::{encode_frame, encode_message, try_decode_frames};
use relaychat_proto::header::FrameHeader;
use relaychat_proto::messages::chat::{ChatMessage, ChatScope};
use relaychat_proto::messages::file::{FileDataHeader, FileOffer, FileOfferResponse};
use relaychat_proto::messages::session::LoginRequest;
use relaychat_proto::msg_type::MsgType;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Heartbeat cadence; the server reaps after 10 s of silence.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// A decoded frame with an owned body.
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

/// Events sent from the connection tasks to the application.
#[derive(Debug)]
pub enum ClientEvent {
    /// Successfully connected to the server.
    Connected,
    /// Disconnected from the server.
    Disconnected { reason: String },
    /// Received a frame from the server.
    Frame(FrameOwned),
}

/// Commands sent to the connection tasks.
#[derive(Debug)]
enum ClientCommand {
    /// Send an already-encoded frame.
    SendRaw(Bytes),
    /// Disconnect and shut down.
    Disconnect,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection closed")]
    ChannelSend,
}

struct ClientInner {
    cmd_tx: mpsc::Sender<ClientCommand>,
    sequence: AtomicU32,
    identity: Mutex<Option<(String, String)>>,
}

/// Handle for driving a live connection. Cheap to clone.
#[derive(Clone)]
pub struct ClientHandle {
    inner: Arc<ClientInner>,
}

/// Connect to the server and spawn the reader, writer, and heartbeat tasks.
///
/// Frames and lifecycle changes arrive on `event_tx`; the returned handle
/// sends. Call `disconnect` to tear the connection down.
pub async fn connect(
    addr: SocketAddr,
    event_tx: mpsc::Sender<ClientEvent>,
) -> Result<ClientHandle, ClientError> {
    info!("connecting to relay server at {}", addr);

    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ClientError::ConnectionFailed(format!("connect to {}: {}", addr, e)))?;
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();

    let (cmd_tx, cmd_rx) = mpsc::channel::<ClientCommand>(256);

    let event_tx_writer = event_tx.clone();
    tokio::spawn(async move {
        writer_loop(write_half, cmd_rx, event_tx_writer).await;
    });
    tokio::spawn(async move {
        reader_loop(read_half, event_tx).await;
    });

    let handle = ClientHandle {
        inner: Arc::new(ClientInner {
            cmd_tx,
            sequence: AtomicU32::new(0),
            identity: Mutex::new(None),
        }),
    };

    let heartbeat = handle.clone();
    tokio::spawn(async move {
        heartbeat_loop(heartbeat).await;
    });

    Ok(handle)
}

impl ClientHandle {
    fn next_seq(&self) -> u32 {
        self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn identity(&self) -> (String, String) {
        self.inner
            .identity
            .lock()
            .ok()
            .and_then(|g| g.clone())
            .unwrap_or_default()
    }

    /// Remember the identity used for login; chat sends carry it.
    pub fn set_identity(&self, client_id: &str, nickname: &str) {
        if let Ok(mut guard) = self.inner.identity.lock() {
            *guard = Some((client_id.to_string(), nickname.to_string()));
        }
    }

    async fn send_raw(&self, frame: Vec<u8>) -> Result<(), ClientError> {
        self.inner
            .cmd_tx
            .send(ClientCommand::SendRaw(Bytes::from(frame)))
            .await
            .map_err(|_| ClientError::ChannelSend)
    }

    pub async fn send_heartbeat(&self) -> Result<(), ClientError> {
        self.send_raw(encode_frame(MsgType::HeartbeatReq, self.next_seq(), &[]))
            .await
    }

    pub async fn send_login(&self, client_id: &str, nickname: &str) -> Result<(), ClientError> {
        self.set_identity(client_id, nickname);
        let req = LoginRequest {
            client_id: client_id.to_string(),
            nickname: nickname.to_string(),
        };
        self.send_raw(encode_message(self.next_seq(), &req)).await
    }

    pub async fn send_logout(&self) -> Result<(), ClientError> {
        self.send_raw(encode_frame(MsgType::LogoutReq, self.next_seq(), &[]))
            .await
    }

    pub async fn request_user_list(&self) -> Result<(), ClientError> {
        self.send_raw(encode_frame(MsgType::UserListReq, self.next_seq(), &[]))
            .await
    }

    /// Send a chat message. The server overwrites the identity fields with
    /// the roster-bound values; a zero timestamp asks it to stamp the time.
    pub async fn send_chat(
        &self,
        scope: ChatScope,
        to_id: &str,
        message: &str,
    ) -> Result<(), ClientError> {
        let (from_id, from_nick) = self.identity();
        let msg = ChatMessage {
            chat_type: scope.as_u8(),
            from_id,
            from_nick,
            to_id: to_id.to_string(),
            timestamp: 0,
            message: message.to_string(),
        };
        self.send_raw(encode_message(self.next_seq(), &msg)).await
    }

    pub async fn send_file_offer(
        &self,
        file_id: &str,
        to_id: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<(), ClientError> {
        let (from_id, from_nick) = self.identity();
        let offer = FileOffer {
            file_id: file_id.to_string(),
            from_id,
            from_nick,
            to_id: to_id.to_string(),
            file_size,
            file_name: file_name.to_string(),
        };
        self.send_raw(encode_message(self.next_seq(), &offer)).await
    }

    pub async fn send_file_offer_response(
        &self,
        file_id: &str,
        result: u32,
        message: &str,
    ) -> Result<(), ClientError> {
        let rsp = FileOfferResponse {
            file_id: file_id.to_string(),
            result,
            message: message.to_string(),
        };
        self.send_raw(encode_message(self.next_seq(), &rsp)).await
    }

    /// Stream one chunk of file payload.
    pub async fn send_file_data(
        &self,
        file_id: &str,
        offset: u64,
        chunk: &[u8],
    ) -> Result<(), ClientError> {
        let header = FileDataHeader {
            file_id: file_id.to_string(),
            offset,
            chunk_size: chunk.len() as u32,
        };
        let mut body = vec![0u8; FileDataHeader::LEN + chunk.len()];
        header.encode_into(&mut body[..FileDataHeader::LEN]);
        body[FileDataHeader::LEN..].copy_from_slice(chunk);
        self.send_raw(encode_frame(MsgType::FileData, self.next_seq(), &body))
            .await
    }

    /// Acknowledge a received chunk; the server relays this to the sender.
    pub async fn send_file_data_ack(
        &self,
        file_id: &str,
        offset: u64,
        chunk_size: u32,
    ) -> Result<(), ClientError> {
        let header = FileDataHeader {
            file_id: file_id.to_string(),
            offset,
            chunk_size,
        };
        let mut body = vec![0u8; FileDataHeader::LEN];
        header.encode_into(&mut body);
        self.send_raw(encode_frame(MsgType::FileDataAck, self.next_seq(), &body))
            .await
    }

    /// Request disconnect.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.inner
            .cmd_tx
            .send(ClientCommand::Disconnect)
            .await
            .map_err(|_| ClientError::ChannelSend)
    }
}

/// Writer task: receives commands and writes to the socket.
async fn writer_loop(
    mut write: tokio::net::tcp::OwnedWriteHalf,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
    event_tx: mpsc::Sender<ClientEvent>,
) {
    loop {
        match cmd_rx.recv().await {
            Some(ClientCommand::SendRaw(bytes)) => {
                trace!("sending {} bytes to server", bytes.len());
                if let Err(e) = write.write_all(&bytes).await {
                    warn!("write error: {}", e);
                    let _ = event_tx
                        .send(ClientEvent::Disconnected {
                            reason: format!("write error: {}", e),
                        })
                        .await;
                    break;
                }
            }
            Some(ClientCommand::Disconnect) => {
                debug!("disconnect command received");
                break;
            }
            None => {
                debug!("command channel closed");
                break;
            }
        }
    }

    // Attempt graceful shutdown
    let _ = write.shutdown().await;
}

/// Reader task: assembles frames from the socket and emits events.
async fn reader_loop(
    mut read: tokio::net::tcp::OwnedReadHalf,
    event_tx: mpsc::Sender<ClientEvent>,
) {
    let mut buf = BytesMut::with_capacity(8 * 1024);
    let _ = event_tx.send(ClientEvent::Connected).await;

    loop {
        buf.reserve(4096);
        match read.read_buf(&mut buf).await {
            Ok(0) => {
                info!("server closed connection");
                let _ = event_tx
                    .send(ClientEvent::Disconnected {
                        reason: "server closed connection".to_string(),
                    })
                    .await;
                break;
            }
            Ok(n) => {
                trace!("received {} bytes from server", n);

                let (views, consumed, corruption) = try_decode_frames(&buf);
                if let Some(e) = corruption {
                    // Same lenient resync policy as the server: drop what we
                    // have buffered and keep reading.
                    warn!("wire corruption from server, receive buffer discarded: {}", e);
                }

                let mut closed = false;
                for view in views {
                    let frame = FrameOwned {
                        header: view.header,
                        body: Bytes::copy_from_slice(view.body),
                    };
                    if event_tx.send(ClientEvent::Frame(frame)).await.is_err() {
                        warn!("event channel closed");
                        closed = true;
                        break;
                    }
                }
                buf.advance(consumed);
                if closed {
                    return;
                }
            }
            Err(e) => {
                warn!("read error: {}", e);
                let _ = event_tx
                    .send(ClientEvent::Disconnected {
                        reason: e.to_string(),
                    })
                    .await;
                break;
            }
        }
    }
}

/// Keep-alive task: one HEARTBEAT_REQ every interval until the connection
/// goes away.
async fn heartbeat_loop(handle: ClientHandle) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if handle.send_heartbeat().await.is_err() {
            break;
        }
    }
}
