use prost::Message;

use crate::error::Result;
use crate::pb::{PeerList, PeerRecord};

use super::peer::{Peer, PeerInfo};

impl From<&Peer> for PeerRecord {
    fn from(peer: &Peer) -> Self {
        PeerRecord {
            id: peer.id().to_string(),
            address: peer.address().to_string(),
            heartbeat: peer.get_heartbeat(),
        }
    }
}

impl From<PeerRecord> for PeerInfo {
    fn from(record: PeerRecord) -> Self {
        PeerInfo {
            id: record.id,
            address: record.address,
            heartbeat: record.heartbeat,
        }
    }
}

impl From<&PeerInfo> for PeerRecord {
    fn from(info: &PeerInfo) -> Self {
        PeerRecord {
            id: info.id.clone(),
            address: info.address.clone(),
            heartbeat: info.heartbeat,
        }
    }
}

pub(crate) fn encode_peers(peers: &[Peer]) -> Vec<u8> {
    let list = PeerList {
        peers: peers.iter().map(PeerRecord::from).collect(),
    };
    list.encode_to_vec()
}

pub(crate) fn decode_peers(buf: &[u8]) -> Result<Vec<PeerInfo>> {
    let list = PeerList::decode(buf)?;
    Ok(list.peers.into_iter().map(PeerInfo::from).collect())
}
