use std::net::SocketAddr;
use std::time::Duration;

use snafu::location;

use crate::error::{Error, Result};

/// Default suspicion threshold (`Tfail`).
/// A peer not refreshed for this long past its deadline becomes a suspect.
const DEFAULT_FAIL_TIMEOUT: Duration = Duration::from_millis(150);

/// Default refresh window (`Tround`) granted on every accepted update.
const DEFAULT_ROUND_INTERVAL: Duration = Duration::from_millis(150);

/// Default cadence of the suspicion/eviction sweep.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// Default interval between two gossip rounds.
const DEFAULT_GOSSIP_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of peers contacted per gossip round.
const DEFAULT_FANOUT: usize = 3;

/// Largest payload a single UDP datagram can carry.
pub(crate) const MAX_DATAGRAM_SIZE: usize = 65_507;

const ENV_MY_ID: &str = "MY_ID";
const ENV_ADDRESS: &str = "ADDRESS";
const ENV_SEEDS: &str = "SEEDS";

/// Builder for creating a [`GossipConfig`].
#[derive(Clone, Debug)]
pub struct GossipConfigBuilder {
    /// Identity of this node within the cluster.
    id: String,
    /// `host:port` this node listens on.
    addr: String,
    /// `(id, address)` pairs used to pre-populate the alive set.
    seeds: Vec<(String, String)>,
    fail_timeout: Duration,
    /// Falls back to twice the fail timeout when unset.
    cleanup_timeout: Option<Duration>,
    round_interval: Duration,
    sweep_interval: Duration,
    gossip_interval: Duration,
    fanout: usize,
}

impl GossipConfigBuilder {
    /// Creates a new [`GossipConfigBuilder`] with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `MY_ID`, `ADDRESS` and `SEEDS` from the process environment.
    ///
    /// `SEEDS` is a comma separated list of `id=host:port` entries and may be empty,
    /// but each variable must be present.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| Error::Config {
                message: format!("environment variable '{key}' is not set"),
                location: location!(),
            })
        };

        let id = require(ENV_MY_ID)?;
        let addr = require(ENV_ADDRESS)?;
        addr.parse::<SocketAddr>()?;
        let seeds = parse_seeds(&require(ENV_SEEDS)?)?;

        Ok(Self::new().with_id(id).with_addr(addr).with_seeds(seeds))
    }

    /// Consumes the builder and returns a fully constructed [`GossipConfig`].
    pub fn build(self) -> GossipConfig {
        GossipConfig {
            id: self.id,
            addr: self.addr,
            seeds: self.seeds,
            fail_timeout: self.fail_timeout,
            cleanup_timeout: self
                .cleanup_timeout
                .unwrap_or_else(|| self.fail_timeout.saturating_mul(2)),
            round_interval: self.round_interval,
            sweep_interval: self.sweep_interval,
            gossip_interval: self.gossip_interval,
            fanout: self.fanout,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Sets the seed peers as `(id, address)` pairs.
    pub fn with_seeds<T, I, A>(mut self, seeds: T) -> Self
    where
        T: IntoIterator<Item = (I, A)>,
        I: Into<String>,
        A: Into<String>,
    {
        self.seeds = seeds
            .into_iter()
            .map(|(id, addr)| (id.into(), addr.into()))
            .collect();
        self
    }

    pub fn with_fail_timeout(mut self, fail_timeout: Duration) -> Self {
        self.fail_timeout = fail_timeout;
        self
    }

    pub fn with_cleanup_timeout(mut self, cleanup_timeout: Duration) -> Self {
        self.cleanup_timeout = Some(cleanup_timeout);
        self
    }

    pub fn with_round_interval(mut self, round_interval: Duration) -> Self {
        self.round_interval = round_interval;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn with_gossip_interval(mut self, gossip_interval: Duration) -> Self {
        self.gossip_interval = gossip_interval;
        self
    }

    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }
}

impl Default for GossipConfigBuilder {
    fn default() -> Self {
        Self {
            id: String::new(),
            addr: "127.0.0.1:0".to_string(),
            seeds: vec![],
            fail_timeout: DEFAULT_FAIL_TIMEOUT,
            cleanup_timeout: None,
            round_interval: DEFAULT_ROUND_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            gossip_interval: DEFAULT_GOSSIP_INTERVAL,
            fanout: DEFAULT_FANOUT,
        }
    }
}

fn parse_seeds(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| match entry.trim().split_once('=') {
            Some((id, addr)) if !id.is_empty() && !addr.is_empty() => {
                addr.parse::<SocketAddr>()?;
                Ok((id.to_string(), addr.to_string()))
            }
            _ => Err(Error::Config {
                message: format!("invalid seed entry '{entry}', expected 'id=host:port'"),
                location: location!(),
            }),
        })
        .collect()
}

/// Configuration of a gossip node: its identity, seeds, detector timeouts and
/// gossip cadence.
#[derive(Clone, Debug)]
pub struct GossipConfig {
    id: String,
    addr: String,
    seeds: Vec<(String, String)>,
    fail_timeout: Duration,
    cleanup_timeout: Duration,
    round_interval: Duration,
    sweep_interval: Duration,
    gossip_interval: Duration,
    fanout: usize,
}

impl GossipConfig {
    /// Creates a new [`GossipConfig`] with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new [`GossipConfigBuilder`] to construct a [`GossipConfig`].
    pub fn builder() -> GossipConfigBuilder {
        GossipConfigBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn seeds(&self) -> &[(String, String)] {
        &self.seeds
    }

    /// Replaces the configured address with the one the transport actually bound to.
    pub(crate) fn bound_to(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Returns `Tfail`, the suspicion threshold.
    pub fn fail_timeout(&self) -> Duration {
        self.fail_timeout
    }

    /// Returns `Tcleanup`, the time a peer may stay suspected before eviction.
    pub fn cleanup_timeout(&self) -> Duration {
        self.cleanup_timeout
    }

    /// Returns `Tround`, the refresh window granted on every accepted update.
    pub fn round_interval(&self) -> Duration {
        self.round_interval
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    pub fn gossip_interval(&self) -> Duration {
        self.gossip_interval
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        GossipConfigBuilder::new().build()
    }
}
