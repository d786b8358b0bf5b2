//! File-transfer rendezvous table.
//!
//! A `FileSession` authorizes FILE_DATA frames to be relayed between two
//! specific connections. It is created when the server forwards an offer,
//! bound to a receiver on ACCEPT, and destroyed on decline or when either
//! endpoint disconnects. There is no completion message on the wire, so
//! disconnect is the only normal reclamation point.

use std::collections::HashMap;

use crate::net::inbound::ConnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSession {
    pub sender: ConnId,
    /// Unassigned until the target accepts the offer.
    pub receiver: Option<ConnId>,
}

/// Outcome of resolving the relay target for a FILE_DATA frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPeer {
    UnknownFile,
    NotParty,
    Unassigned,
    Peer(ConnId),
}

#[derive(Default)]
pub struct TransferTable {
    sessions: HashMap<String, FileSession>,
}

impl TransferTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_id: String, sender: ConnId) {
        self.sessions.insert(
            file_id,
            FileSession {
                sender,
                receiver: None,
            },
        );
    }

    pub fn get(&self, file_id: &str) -> Option<FileSession> {
        self.sessions.get(file_id).copied()
    }

    pub fn bind_receiver(&mut self, file_id: &str, receiver: ConnId) -> bool {
        match self.sessions.get_mut(file_id) {
            Some(session) if session.receiver.is_none() => {
                session.receiver = Some(receiver);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, file_id: &str) -> Option<FileSession> {
        self.sessions.remove(file_id)
    }

    /// Drop every session the given connection participates in.
    /// Returns how many were reclaimed (for the disconnect log).
    pub fn remove_for_conn(&mut self, conn_id: ConnId) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| s.sender != conn_id && s.receiver != Some(conn_id));
        before - self.sessions.len()
    }

    /// The other endpoint of a session, from the perspective of `from`.
    pub fn relay_peer(&self, file_id: &str, from: ConnId) -> RelayPeer {
        let Some(session) = self.sessions.get(file_id) else {
            return RelayPeer::UnknownFile;
        };
        if from == session.sender {
            match session.receiver {
                Some(receiver) => RelayPeer::Peer(receiver),
                None => RelayPeer::Unassigned,
            }
        } else if session.receiver == Some(from) {
            RelayPeer::Peer(session.sender)
        } else {
            RelayPeer::NotParty
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
