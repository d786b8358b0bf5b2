//! Roster of connected clients.
//!
//! Every accepted connection gets an anonymous entry; logging in binds a
//! `client_id`/`nickname` pair and flips the entry online. Uniqueness of ids
//! and nicknames is enforced against online entries only, so a half-open
//! connection can never squat a name. The roster is owned and mutated solely
//! by the dispatch loop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::net::inbound::ConnId;

#[derive(Debug, Clone)]
pub struct ClientSession {
    pub conn_id: ConnId,
    pub peer: SocketAddr,
    pub client_id: String,
    pub nickname: String,
    pub online: bool,
    pub last_heartbeat: Instant,
}

#[derive(Default)]
pub struct Roster {
    entries: HashMap<ConnId, ClientSession>,
    /// client_id -> conn_id, online sessions only.
    by_client_id: HashMap<String, ConnId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an anonymous connection. Liveness starts counting now.
    pub fn add(&mut self, conn_id: ConnId, peer: SocketAddr) {
        self.entries.insert(
            conn_id,
            ClientSession {
                conn_id,
                peer,
                client_id: String::new(),
                nickname: String::new(),
                online: false,
                last_heartbeat: Instant::now(),
            },
        );
    }

    pub fn remove(&mut self, conn_id: ConnId) -> Option<ClientSession> {
        let session = self.entries.remove(&conn_id)?;
        if session.online {
            self.by_client_id.remove(&session.client_id);
        }
        Some(session)
    }

    pub fn get(&self, conn_id: ConnId) -> Option<&ClientSession> {
        self.entries.get(&conn_id)
    }

    pub fn touch_heartbeat(&mut self, conn_id: ConnId) {
        if let Some(session) = self.entries.get_mut(&conn_id) {
            session.last_heartbeat = Instant::now();
        }
    }

    /// Bind an identity to a connection and mark it online.
    ///
    /// Callers verify uniqueness first; this is the final set. Rebinding an
    /// already-online connection re-points the id index.
    pub fn bind_identity(&mut self, conn_id: ConnId, client_id: &str, nickname: &str) -> bool {
        if client_id.is_empty() || nickname.is_empty() {
            return false;
        }
        let Some(session) = self.entries.get_mut(&conn_id) else {
            return false;
        };

        if session.online {
            self.by_client_id.remove(&session.client_id);
        }
        session.client_id = client_id.to_string();
        session.nickname = nickname.to_string();
        session.online = true;
        session.last_heartbeat = Instant::now();
        self.by_client_id.insert(client_id.to_string(), conn_id);
        true
    }

    pub fn is_client_id_online(&self, client_id: &str, exclude: ConnId) -> bool {
        self.by_client_id
            .get(client_id)
            .map_or(false, |&conn_id| conn_id != exclude)
    }

    pub fn is_nickname_online(&self, nickname: &str, exclude: ConnId) -> bool {
        self.entries
            .values()
            .any(|s| s.online && s.conn_id != exclude && s.nickname == nickname)
    }

    /// Connection currently bound to `client_id`, online sessions only.
    pub fn conn_by_client_id(&self, client_id: &str) -> Option<ConnId> {
        self.by_client_id.get(client_id).copied()
    }

    /// Copy of all online sessions, in no particular order.
    pub fn online_snapshot(&self) -> Vec<ClientSession> {
        self.entries.values().filter(|s| s.online).cloned().collect()
    }

    /// Connections whose last heartbeat is older than `threshold`.
    /// Anonymous connections count too; an idle pre-login socket is reaped
    /// like any other.
    pub fn timed_out(&self, threshold: Duration) -> Vec<ConnId> {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|s| now.duration_since(s.last_heartbeat) > threshold)
            .map(|s| s.conn_id)
            .collect()
    }

    pub fn online_count(&self) -> usize {
        self.by_client_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:1234".parse().unwrap()
    }

    #[test]
    fn anonymous_entries_stay_out_of_the_online_view() {
        let mut roster = Roster::new();
        roster.add(1, peer());
        roster.add(2, peer());

        assert_eq!(roster.online_count(), 0);
        assert!(roster.online_snapshot().is_empty());
        assert!(!roster.is_client_id_online("alice", 0));
    }

    #[test]
    fn bind_identity_enforced_by_callers_updates_indexes() {
        let mut roster = Roster::new();
        roster.add(1, peer());
        assert!(roster.bind_identity(1, "alice", "Alice"));

        assert_eq!(roster.online_count(), 1);
        assert_eq!(roster.conn_by_client_id("alice"), Some(1));
        assert!(roster.is_client_id_online("alice", 0));
        // A connection never conflicts with itself.
        assert!(!roster.is_client_id_online("alice", 1));
        assert!(roster.is_nickname_online("Alice", 0));
        assert!(!roster.is_nickname_online("Alice", 1));
    }

    #[test]
    fn bind_identity_rejects_empty_fields() {
        let mut roster = Roster::new();
        roster.add(1, peer());
        assert!(!roster.bind_identity(1, "", "Alice"));
        assert!(!roster.bind_identity(1, "alice", ""));
        assert!(!roster.bind_identity(99, "alice", "Alice"));
        assert_eq!(roster.online_count(), 0);
    }

    #[test]
    fn rebinding_repoints_the_id_index() {
        let mut roster = Roster::new();
        roster.add(1, peer());
        assert!(roster.bind_identity(1, "alice", "Alice"));
        assert!(roster.bind_identity(1, "alice2", "Alice"));

        assert_eq!(roster.conn_by_client_id("alice"), None);
        assert_eq!(roster.conn_by_client_id("alice2"), Some(1));
        assert_eq!(roster.online_count(), 1);
    }

    #[test]
    fn remove_clears_the_id_index() {
        let mut roster = Roster::new();
        roster.add(1, peer());
        roster.bind_identity(1, "alice", "Alice");
        roster.remove(1);

        assert_eq!(roster.conn_by_client_id("alice"), None);
        assert_eq!(roster.online_count(), 0);
    }

    #[test]
    fn timed_out_reports_stale_entries() {
        let mut roster = Roster::new();
        roster.add(1, peer());
        roster.add(2, peer());
        roster.bind_identity(2, "bob", "Bob");

        assert!(roster.timed_out(Duration::from_secs(10)).is_empty());

        // Zero threshold makes everything stale, anonymous included.
        std::thread::sleep(Duration::from_millis(2));
        let mut stale = roster.timed_out(Duration::from_millis(1));
        stale.sort_unstable();
        assert_eq!(stale, vec![1, 2]);

        roster.touch_heartbeat(1);
        assert_eq!(roster.timed_out(Duration::from_millis(1)), vec![2]);
    }
}
