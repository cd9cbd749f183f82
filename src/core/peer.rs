use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Shared handle to a peer record. Moving a peer between the alive and suspected
/// sets moves the handle, the record itself stays put.
pub type PeerHandle = Arc<Peer>;

// Roughly a century; the fallback horizon for refresh windows that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The decoded `(id, address, heartbeat)` tuple exchanged with transport and monitoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    pub address: String,
    pub heartbeat: u64,
}

impl PeerInfo {
    pub fn new(id: impl Into<String>, address: impl Into<String>, heartbeat: u64) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            heartbeat,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct PeerState {
    heartbeat: u64,
    deadline: Instant,
}

/// A cluster member as seen by this node.
///
/// `heartbeat` is the peer's own logical clock and `deadline` the monotonic instant
/// until which the last accepted update keeps it fresh. Both live behind a record-local
/// lock, so every accessor is atomic with respect to the others on the same record.
#[derive(Debug)]
pub struct Peer {
    id: String,
    address: String,
    state: Mutex<PeerState>,
}

impl Peer {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_heartbeat(id, address, 1)
    }

    pub fn with_heartbeat(id: impl Into<String>, address: impl Into<String>, heartbeat: u64) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            state: Mutex::new(PeerState {
                heartbeat,
                deadline: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn get_heartbeat(&self) -> u64 {
        self.state.lock().heartbeat
    }

    pub fn set_heartbeat(&self, heartbeat: u64) {
        self.state.lock().heartbeat = heartbeat;
    }

    pub fn increment_heartbeat(&self) {
        let mut state = self.state.lock();
        state.heartbeat = state.heartbeat.saturating_add(1);
    }

    /// Sets the deadline to `now + round`.
    pub fn refresh(&self, round: Duration) {
        self.refresh_at(Instant::now(), round);
    }

    pub fn refresh_at(&self, now: Instant, round: Duration) {
        self.state.lock().deadline = expires_at(now, round);
    }

    pub fn deadline(&self) -> Instant {
        self.state.lock().deadline
    }

    /// Strictly greater heartbeat: `self` is a later epoch of the same peer.
    pub fn is_newer_than(&self, other: &Peer) -> bool {
        self.get_heartbeat() > other.get_heartbeat()
    }

    /// Overwrites heartbeat and deadline only if `heartbeat` is strictly greater than
    /// the stored one. Compare and update happen under one lock acquisition.
    pub(crate) fn advance(&self, heartbeat: u64, now: Instant, round: Duration) -> bool {
        let mut state = self.state.lock();
        if heartbeat <= state.heartbeat {
            return false;
        }

        state.heartbeat = heartbeat;
        state.deadline = expires_at(now, round);
        true
    }

    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            id: self.id.clone(),
            address: self.address.clone(),
            heartbeat: self.get_heartbeat(),
        }
    }
}

/// `now + round`, clamped to the furthest instant the clock can represent.
fn expires_at(now: Instant, round: Duration) -> Instant {
    now.checked_add(round)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl Clone for Peer {
    fn clone(&self) -> Self {
        let state = *self.state.lock();
        Self {
            id: self.id.clone(),
            address: self.address.clone(),
            state: Mutex::new(state),
        }
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Peer {}

impl From<PeerInfo> for Peer {
    fn from(info: PeerInfo) -> Self {
        Peer::with_heartbeat(info.id, info.address, info.heartbeat)
    }
}

impl From<&Peer> for PeerInfo {
    fn from(peer: &Peer) -> Self {
        peer.info()
    }
}
