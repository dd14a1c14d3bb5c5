//! Membership registry — tracks currently-reachable peers from heartbeats.
//!
//! The peer list and the heartbeat table live behind one mutex so the two
//! structures always change together: an address has a last-seen timestamp
//! iff it has a peer record. Critical sections are a few map operations,
//! so a blocking mutex is fine from async contexts.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One discovered peer. Uniqueness is by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Display name from the first heartbeat seen for this address.
    pub username: String,
    pub addr: IpAddr,
}

struct Inner {
    /// Peers in discovery order — the menu shows these with 1-based indices.
    peers: Vec<PeerRecord>,
    /// Address → last heartbeat arrival time.
    last_heartbeat: HashMap<IpAddr, Instant>,
}

/// The membership registry, shared between the discovery listener, the
/// outbound senders, and the display routine.
pub struct Registry {
    inner: Mutex<Inner>,
}

pub type SharedRegistry = Arc<Registry>;

/// Create a new empty registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                peers: Vec::new(),
                last_heartbeat: HashMap::new(),
            }),
        }
    }

    /// Record a heartbeat from `addr`.
    ///
    /// An unknown address gets a new peer record. The stored name is never
    /// changed by later heartbeats — first-seen name wins. The last-seen
    /// timestamp is always refreshed.
    pub fn record_heartbeat(&self, addr: IpAddr, username: &str, now: Instant) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if !inner.peers.iter().any(|p| p.addr == addr) {
            tracing::info!(%addr, username, "peer discovered");
            inner.peers.push(PeerRecord {
                username: username.to_string(),
                addr,
            });
        }
        inner.last_heartbeat.insert(addr, now);
    }

    /// Remove every peer whose last heartbeat is older than `timeout`
    /// relative to `now`. Returns how many were evicted.
    pub fn evict_stale(&self, now: Instant, timeout: Duration) -> usize {
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        let stale: Vec<IpAddr> = inner
            .last_heartbeat
            .iter()
            .filter(|(_, last)| now.saturating_duration_since(**last) > timeout)
            .map(|(addr, _)| *addr)
            .collect();

        for addr in &stale {
            inner.last_heartbeat.remove(addr);
            inner.peers.retain(|p| p.addr != *addr);
            tracing::info!(%addr, "peer evicted — heartbeat timeout");
        }
        stale.len()
    }

    /// Current peer list in discovery order.
    pub fn snapshot(&self) -> Vec<PeerRecord> {
        self.inner.lock().expect("registry lock poisoned").peers.clone()
    }

    /// Look up a peer by 1-based menu index.
    pub fn by_index(&self, index: usize) -> Option<PeerRecord> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        if index == 0 {
            return None;
        }
        inner.peers.get(index - 1).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry lock poisoned").peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
