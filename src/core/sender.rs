use std::sync::Arc;

use crate::api::config::GossipConfig;

use super::detection::Members;
use super::message::encode_peers;
use super::peer::Peer;
use super::transport::TransportLayer;

/// Runs outbound gossip rounds: beats this node's own heartbeat and pushes the alive
/// view to a random fan-out of peers.
#[derive(Debug)]
pub(crate) struct MessageSender<T: TransportLayer> {
    socket: Arc<T>,
    members: Arc<Members>,
    config: Arc<GossipConfig>,
}

impl<T: TransportLayer> MessageSender<T> {
    pub(crate) fn new(socket: Arc<T>, members: Arc<Members>, config: Arc<GossipConfig>) -> Self {
        Self {
            socket,
            members,
            config,
        }
    }

    /// Sends one round and returns how many datagrams went out.
    pub(crate) async fn gossip_round(&self) -> usize {
        self.members.beat();

        let targets = self.members.get_random_peers(self.config.fanout());
        if targets.is_empty() {
            return 0;
        }

        self.send_to_targets(&targets).await
    }

    /// Sends the current alive view to every target. A failed send is logged and the
    /// remaining targets are still served; the next round is the retry.
    pub(crate) async fn send_to_targets(&self, targets: &[Peer]) -> usize {
        let alive = self.members.get_alive_peers();
        let buf = encode_peers(&alive);

        let mut sent = 0;
        for target in targets {
            match self.socket.send_to(&buf, target.address()).await {
                Ok(_) => {
                    tracing::trace!(
                        "[{}] sent {} peers to {}",
                        self.members.me(),
                        alive.len(),
                        target.id()
                    );
                    sent += 1;
                }
                Err(e) => tracing::warn!(
                    "[{}] failed to send gossip to {} at {}: {e}",
                    self.members.me(),
                    target.id(),
                    target.address()
                ),
            }
        }

        sent
    }
}
