use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::{thread_rng, Rng};

use crate::api::config::GossipConfig;
use crate::error::Result;

use super::member::{Membership, MembersTable};
use super::peer::{Peer, PeerHandle, PeerInfo};
use super::shutdown::Shutdown;
use super::status::{PeersStatus, Status};

#[derive(Debug)]
struct Detector {
    me: String,
    table: MembersTable,
    fail_timeout: Duration,
    cleanup_timeout: Duration,
    round_interval: Duration,
    sweep_interval: Duration,
}

impl Detector {
    fn heartbeat(&self, peer: Peer, now: Instant) {
        let heartbeat = peer.get_heartbeat();
        let existing = match self.table.lookup(peer.id()) {
            Some(existing) => existing,
            None => {
                peer.refresh_at(now, self.round_interval);
                let handle = Arc::new(peer);
                match self.table.add_if_absent(handle.clone()) {
                    None => {
                        tracing::info!(
                            "[{}] new peer found {} at {}",
                            &self.me,
                            handle.id(),
                            handle.address()
                        );
                        return;
                    }
                    // Registered by a concurrent writer in the meantime.
                    Some(existing) => existing,
                }
            }
        };

        match existing {
            Membership::Alive(existing) => {
                if !existing.advance(heartbeat, now, self.round_interval) {
                    tracing::debug!(
                        "[{}] dropping stale heartbeat {} for {}",
                        &self.me,
                        heartbeat,
                        existing.id()
                    );
                }
            }
            Membership::Suspected(existing) => {
                if existing.advance(heartbeat, now, self.round_interval) {
                    tracing::info!("[{}] heard from suspected peer {}", &self.me, existing.id());
                    self.table.to_alive(existing.id());
                }
            }
        }
    }

    fn sweep(&self, now: Instant) {
        for peer in self.table.snapshot_suspected() {
            if peer.id() == self.me || !expired(peer.deadline(), self.cleanup_timeout, now) {
                continue;
            }
            self.evict(peer.id(), now);
        }

        for peer in self.table.snapshot_alive() {
            if peer.id() == self.me || !expired(peer.deadline(), self.fail_timeout, now) {
                continue;
            }
            self.suspect(peer.id(), now);
        }
    }

    // The snapshot may be outdated by now, so the live record is checked again.
    fn suspect(&self, id: &str, now: Instant) {
        let Ok(handle) = self.table.get(id) else {
            return;
        };
        if !expired(handle.deadline(), self.fail_timeout, now) {
            return;
        }

        handle.refresh_at(now, self.round_interval);
        self.table.to_suspected(id);
        tracing::info!("[{}] suspected peer {}", &self.me, id);
    }

    fn evict(&self, id: &str, now: Instant) {
        let Ok(handle) = self.table.get_suspect(id) else {
            return;
        };
        if !expired(handle.deadline(), self.cleanup_timeout, now) {
            return;
        }

        if self.table.evict(id).is_some() {
            tracing::info!("[{}] removed peer {}", &self.me, id);
        }
    }
}

/// `now` lies past `deadline + timeout`. A limit beyond the clock's range never expires.
fn expired(deadline: Instant, timeout: Duration, now: Instant) -> bool {
    deadline
        .checked_add(timeout)
        .is_some_and(|limit| now > limit)
}

#[derive(Debug)]
struct Sweeper {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

impl Sweeper {
    fn is_active(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.handle.is_finished()
    }

    fn join(self, me: &str) {
        if self.handle.join().is_err() {
            tracing::error!("[{me}] sweep thread panicked");
        }
    }
}

/// Heartbeat failure detector and gossip driver.
///
/// Wraps a [`MembersTable`], applies inbound heartbeats with the strictly-newer merge
/// rule and runs a background sweep that moves stale peers to the suspected set and
/// evicts peers that stayed suspected for too long. The node's own entry is exempt
/// from both transitions.
#[derive(Debug)]
pub struct Members {
    detector: Arc<Detector>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl Members {
    /// Creates the detector and pre-populates the alive set with this node and its seeds.
    pub fn new(config: &GossipConfig) -> Self {
        let detector = Detector {
            me: config.id().to_string(),
            table: MembersTable::new(),
            fail_timeout: config.fail_timeout(),
            cleanup_timeout: config.cleanup_timeout(),
            round_interval: config.round_interval(),
            sweep_interval: config.sweep_interval(),
        };
        let members = Self {
            detector: Arc::new(detector),
            sweeper: Mutex::new(None),
        };

        members.add_peer(Peer::new(config.id(), config.addr()));
        for (id, addr) in config.seeds() {
            if id != config.id() {
                members.add_peer(Peer::new(id, addr));
            }
        }

        members
    }

    pub fn me(&self) -> &str {
        &self.detector.me
    }

    pub fn fail_timeout(&self) -> Duration {
        self.detector.fail_timeout
    }

    pub fn cleanup_timeout(&self) -> Duration {
        self.detector.cleanup_timeout
    }

    pub fn round_interval(&self) -> Duration {
        self.detector.round_interval
    }

    /// Refreshes `peer` and upserts it into the alive set.
    pub fn add_peer(&self, peer: Peer) {
        peer.refresh(self.detector.round_interval);
        self.detector.table.add(peer);
    }

    /// Applies one inbound record.
    ///
    /// Unknown peers are added as alive. Known peers are only refreshed when the
    /// incoming heartbeat is strictly greater than the stored one; a suspected peer
    /// is moved back to alive in that case. Everything else is a stale update and is
    /// dropped.
    pub fn heartbeat(&self, peer: Peer) {
        self.detector.heartbeat(peer, Instant::now());
    }

    /// Feeds a decoded peer list through [`Members::heartbeat`].
    pub fn merge<I>(&self, peers: I)
    where
        I: IntoIterator<Item = PeerInfo>,
    {
        for info in peers {
            self.heartbeat(Peer::from(info));
        }
    }

    /// Increments this node's own heartbeat and refreshes its deadline.
    pub fn beat(&self) {
        match self.detector.table.get(&self.detector.me) {
            Ok(me) => {
                me.increment_heartbeat();
                me.refresh(self.detector.round_interval);
            }
            Err(e) => tracing::error!("[{}] own entry is missing: {e}", &self.detector.me),
        }
    }

    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    /// Runs one suspicion/eviction pass as if the clock read `now`.
    pub fn sweep_at(&self, now: Instant) {
        self.detector.sweep(now);
    }

    pub fn to_suspected(&self, id: impl AsRef<str>) {
        self.detector.table.to_suspected(id);
    }

    pub fn get_peer(&self, id: impl AsRef<str>) -> Result<PeerHandle> {
        self.detector.table.get(id)
    }

    pub fn is_alive(&self, id: impl AsRef<str>) -> bool {
        self.detector.table.is_alive(id)
    }

    pub fn is_suspected(&self, id: impl AsRef<str>) -> bool {
        self.detector.table.is_suspected(id)
    }

    pub fn get_alive_peers(&self) -> Vec<Peer> {
        self.detector.table.snapshot_alive()
    }

    pub fn get_suspected_peers(&self) -> Vec<Peer> {
        self.detector.table.snapshot_suspected()
    }

    /// Number of alive peers, this node included.
    pub fn size(&self) -> usize {
        self.detector.table.len()
    }

    /// Draws up to `min(k, alive - 1)` peers uniformly with replacement from the alive
    /// set. Draws that hit this node are discarded without a redraw, so the result can
    /// be shorter than that bound.
    pub fn get_random_peers(&self, k: usize) -> Vec<Peer> {
        let alive = self.detector.table.snapshot_alive();
        if alive.is_empty() {
            return vec![];
        }

        let draws = k.min(alive.len() - 1);
        let mut rng = thread_rng();

        (0..draws)
            .filter_map(|_| {
                let peer = &alive[rng.gen_range(0..alive.len())];
                (peer.id() != self.detector.me).then(|| peer.clone())
            })
            .collect()
    }

    pub fn status(&self) -> Status {
        let mut alive: Vec<PeerInfo> = self.get_alive_peers().iter().map(Peer::info).collect();
        let mut suspects: Vec<PeerInfo> =
            self.get_suspected_peers().iter().map(Peer::info).collect();
        alive.sort_by(|a, b| a.id.cmp(&b.id));
        suspects.sort_by(|a, b| a.id.cmp(&b.id));

        Status {
            peers: PeersStatus { alive, suspects },
        }
    }

    /// Starts the background sweep with a private shutdown token.
    pub fn start(&self) -> Result<()> {
        self.start_with(Shutdown::new())
    }

    /// Starts the background sweep. The thread runs until `shutdown` is cancelled or
    /// [`Members::stop`] is called. Starting a running sweep is a no-op; a sweep whose
    /// token was cancelled is joined and replaced.
    pub fn start_with(&self, shutdown: Shutdown) -> Result<()> {
        let mut sweeper = self.sweeper.lock();
        match sweeper.take() {
            Some(current) if current.is_active() => {
                *sweeper = Some(current);
                return Ok(());
            }
            Some(stale) => stale.join(&self.detector.me),
            None => {}
        }

        let detector = self.detector.clone();
        let token = shutdown.clone();
        let handle = thread::Builder::new()
            .name(format!("sweep-{}", &self.detector.me))
            .spawn(move || {
                tracing::debug!("[{}] sweep started", &detector.me);
                while !token.wait_timeout(detector.sweep_interval) {
                    detector.sweep(Instant::now());
                }
                tracing::debug!("[{}] sweep stopped", &detector.me);
            })?;

        *sweeper = Some(Sweeper { shutdown, handle });
        Ok(())
    }

    /// Signals the sweep thread to stop and joins it.
    pub fn stop(&self) {
        let Some(sweeper) = self.sweeper.lock().take() else {
            return;
        };

        sweeper.shutdown.cancel();
        sweeper.join(&self.detector.me);
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.lock().as_ref().is_some_and(Sweeper::is_active)
    }
}

impl Drop for Members {
    fn drop(&mut self) {
        self.stop();
    }
}
