use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use snafu::location;

use crate::api::config::{GossipConfig, MAX_DATAGRAM_SIZE};
use crate::error::{Error, Result};

use super::detection::Members;
use super::receiver::MessageReceiver;
use super::sender::MessageSender;
use super::transport::TransportLayer;

#[derive(Debug)]
pub(crate) struct GossipNode<T: TransportLayer + 'static> {
    addr: String,
    config: Arc<GossipConfig>,
    socket: Arc<T>,
    members: Arc<Members>,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl<T: TransportLayer + 'static> GossipNode<T> {
    /// Builds a node on top of an already bound transport. The table's self record
    /// carries the address the transport reports, not the requested one.
    pub(crate) fn try_new(socket: T, config: GossipConfig) -> Result<Self> {
        let addr = socket.local_addr()?;
        let config = Arc::new(config.bound_to(addr.clone()));
        let members = Arc::new(Members::new(&config));

        Ok(Self {
            addr,
            config,
            socket: Arc::new(socket),
            members,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn addr(&self) -> &str {
        &self.addr
    }

    pub(crate) fn config(&self) -> &GossipConfig {
        &self.config
    }

    pub(crate) fn members(&self) -> &Arc<Members> {
        &self.members
    }

    /// Starts the sweep thread and spawns the receive and gossip loops. Fails while the
    /// loops of an earlier `run` are still registered; `shutdown` clears them.
    pub(crate) fn run(&self) -> Result<(JoinHandle<()>, JoinHandle<()>)> {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return Err(Error::Internal {
                message: format!("node {} is already running", self.addr),
                location: location!(),
            });
        }

        self.members.start()?;

        let receiver = MessageReceiver::new(self.socket.clone(), self.members.clone());
        let addr = self.addr.clone();
        let recv_handle = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            loop {
                if let Err(e) = receiver.dispatch(&mut buf).await {
                    tracing::error!("[{addr}] error while receiving gossip: {e}");
                }
            }
        });

        let sender = MessageSender::new(
            self.socket.clone(),
            self.members.clone(),
            self.config.clone(),
        );
        let gossip_interval = self.config.gossip_interval();
        let gossip_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(gossip_interval);
            loop {
                interval.tick().await;
                sender.gossip_round().await;
            }
        });

        tasks.extend([recv_handle.abort_handle(), gossip_handle.abort_handle()]);

        Ok((recv_handle, gossip_handle))
    }

    /// Aborts the receive and gossip loops and stops the sweep thread.
    pub(crate) fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.members.stop();
    }
}
