use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::core::detection::Members;
use crate::core::node::GossipNode;
use crate::error::Result;

use super::config::GossipConfig;
use super::init_tracing;

/// A single gossip node bound to a UDP socket.
#[derive(Clone, Debug)]
pub struct GossipCluster {
    node: Arc<GossipNode<UdpSocket>>,
}

impl GossipCluster {
    /// Binds a UDP socket on the configured address. Binding to port `0` is allowed;
    /// the node then advertises the port the OS picked.
    pub async fn try_new(config: GossipConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.addr()).await?;
        let node = Arc::new(GossipNode::try_new(socket, config)?);

        Ok(Self { node })
    }

    pub fn addr(&self) -> &str {
        self.node.addr()
    }

    pub fn config(&self) -> &GossipConfig {
        self.node.config()
    }

    pub fn members(&self) -> &Members {
        self.node.members()
    }

    /// Renders the current membership as `{"peers":{"alive":[..],"suspects":[..]}}`.
    pub fn status_json(&self) -> Result<String> {
        self.node.members().status().to_json()
    }

    /// Starts the sweep thread and the receive and gossip loops.
    ///
    /// Returns the handles of the receive loop and the gossip loop. Fails with
    /// `Error::Internal` while the loops of an earlier `run` are still registered.
    pub async fn run(&self) -> Result<(JoinHandle<()>, JoinHandle<()>)> {
        init_tracing();

        tracing::info!(
            "[{}] starting GossipNode on {}...",
            self.config().id(),
            self.addr()
        );
        self.node.run()
    }

    /// Aborts the receive and gossip loops and stops the sweep thread.
    pub fn shutdown(&self) {
        tracing::info!("[{}] shutting down GossipNode...", self.config().id());
        self.node.shutdown();
    }
}
