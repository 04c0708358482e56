//! Server-side per-peer session tracking.
//!
//! A session holds the first message a peer sent while the server waits for
//! the second one (the keyword).  Sessions are keyed by [`PeerIdentity`], so
//! any number of peers can sit in [`SessionState::AwaitingKeyword`] at once
//! even though the server handles them one at a time.
//!
//! Entries expire after [`SessionConfig::ttl`] and the store never holds more
//! than [`SessionConfig::capacity`] peers; the oldest session is evicted to
//! make room.  The store is owned by a single loop and is not thread-safe.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::config::SessionConfig;
use crate::state::SessionState;

/// Remote endpoint identity: address plus port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIdentity(SocketAddr);

impl PeerIdentity {
    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for PeerIdentity {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<PeerIdentity> for SocketAddr {
    fn from(peer: PeerIdentity) -> Self {
        peer.0
    }
}

impl std::fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Entry {
    message: String,
    stored_at: Instant,
}

/// Map from peer to its stored first message.
#[derive(Debug)]
pub struct SessionStore {
    map: HashMap<PeerIdentity, Entry>,
    /// Insertion order, oldest first.
    order: VecDeque<PeerIdentity>,
    ttl: Option<Duration>,
    capacity: usize,
    evictions: u64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            ttl: config.ttl,
            capacity: config.capacity.max(1),
            evictions: 0,
        }
    }

    /// Where `peer` stands in the exchange.
    pub fn state(&mut self, peer: PeerIdentity) -> SessionState {
        self.purge_expired(Instant::now());
        if self.map.contains_key(&peer) {
            SessionState::AwaitingKeyword
        } else {
            SessionState::AwaitingFirstMessage
        }
    }

    /// Store `message` as `peer`'s first message, replacing any earlier one.
    pub fn store(&mut self, peer: PeerIdentity, message: String) {
        self.insert_at(peer, message, Instant::now());
    }

    /// Remove and return `peer`'s stored message, if still live.
    pub fn take(&mut self, peer: PeerIdentity) -> Option<String> {
        self.purge_expired(Instant::now());
        let entry = self.map.remove(&peer)?;
        self.order.retain(|p| *p != peer);
        Some(entry.message)
    }

    /// Drop `peer`'s session without reading it.
    pub fn remove(&mut self, peer: PeerIdentity) {
        if self.map.remove(&peer).is_some() {
            self.order.retain(|p| *p != peer);
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sessions dropped by expiry or capacity pressure so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    fn insert_at(&mut self, peer: PeerIdentity, message: String, now: Instant) {
        self.purge_expired(now);

        if !self.map.contains_key(&peer) && self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
                self.evictions += 1;
                log::info!("[session] evicted {oldest} (capacity {})", self.capacity);
            }
        }

        self.order.retain(|p| *p != peer);
        self.order.push_back(peer);
        self.map.insert(
            peer,
            Entry {
                message,
                stored_at: now,
            },
        );
    }

    fn purge_expired(&mut self, now: Instant) {
        let Some(ttl) = self.ttl else {
            return;
        };
        // `order` is oldest-first and every store refreshes position, so
        // expired entries are always a prefix.
        while let Some(&oldest) = self.order.front() {
            let expired = self
                .map
                .get(&oldest)
                .map_or(true, |e| now.saturating_duration_since(e.stored_at) >= ttl);
            if !expired {
                break;
            }
            self.order.pop_front();
            if self.map.remove(&oldest).is_some() {
                self.evictions += 1;
                log::info!("[session] expired {oldest}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> PeerIdentity {
        PeerIdentity::from(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn store(ttl: Option<Duration>, capacity: usize) -> SessionStore {
        SessionStore::new(SessionConfig { ttl, capacity })
    }

    #[test]
    fn identity_equality_is_by_value() {
        let a: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let b: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        assert_eq!(PeerIdentity::from(a), PeerIdentity::from(b));
        assert_ne!(PeerIdentity::from(a), peer(5000));

        let mut s = SessionStore::default();
        s.store(PeerIdentity::from(a), "phrase".into());
        assert_eq!(s.take(PeerIdentity::from(b)).as_deref(), Some("phrase"));
    }

    #[test]
    fn first_message_then_keyword_cycle() {
        let mut s = SessionStore::default();
        assert_eq!(s.state(peer(1)), SessionState::AwaitingFirstMessage);
        s.store(peer(1), "hello".into());
        assert_eq!(s.state(peer(1)), SessionState::AwaitingKeyword);
        assert_eq!(s.take(peer(1)).as_deref(), Some("hello"));
        assert_eq!(s.state(peer(1)), SessionState::AwaitingFirstMessage);
        assert!(s.is_empty());
    }

    #[test]
    fn peers_are_isolated() {
        let mut s = SessionStore::default();
        s.store(peer(1), "from a".into());
        s.store(peer(2), "from b".into());
        assert_eq!(s.take(peer(1)).as_deref(), Some("from a"));
        assert_eq!(s.state(peer(2)), SessionState::AwaitingKeyword);
        assert_eq!(s.take(peer(2)).as_deref(), Some("from b"));
    }

    #[test]
    fn restore_overwrites_pending_message() {
        let mut s = SessionStore::default();
        s.store(peer(1), "old".into());
        s.store(peer(1), "new".into());
        assert_eq!(s.len(), 1);
        assert_eq!(s.take(peer(1)).as_deref(), Some("new"));
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut s = store(None, 2);
        s.store(peer(1), "a".into());
        s.store(peer(2), "b".into());
        s.store(peer(3), "c".into());
        assert_eq!(s.len(), 2);
        assert_eq!(s.evictions(), 1);
        assert_eq!(s.state(peer(1)), SessionState::AwaitingFirstMessage);
        assert_eq!(s.take(peer(3)).as_deref(), Some("c"));
    }

    #[test]
    fn expired_sessions_are_purged() {
        let mut s = store(Some(Duration::from_secs(10)), 16);
        let t0 = Instant::now();
        s.insert_at(peer(1), "stale".into(), t0);
        s.insert_at(peer(2), "fresh".into(), t0 + Duration::from_secs(8));

        s.purge_expired(t0 + Duration::from_secs(11));
        assert_eq!(s.len(), 1);
        assert_eq!(s.evictions(), 1);
        assert!(!s.map.contains_key(&peer(1)));
        assert!(s.map.contains_key(&peer(2)));
    }

    #[test]
    fn no_ttl_keeps_sessions() {
        let mut s = store(None, 16);
        let t0 = Instant::now();
        s.insert_at(peer(1), "kept".into(), t0);
        s.purge_expired(t0 + Duration::from_secs(1_000_000));
        assert_eq!(s.len(), 1);
    }
}
