use serde::Serialize;

use crate::error::Result;

use super::peer::PeerInfo;

/// Point-in-time view of the membership table for monitoring.
///
/// Renders as `{"peers":{"alive":[...],"suspects":[...]}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Status {
    pub peers: PeersStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeersStatus {
    pub alive: Vec<PeerInfo>,
    pub suspects: Vec<PeerInfo>,
}

impl Status {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
