use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::core::message::decode_peers;
use crate::core::peer::PeerInfo;
use crate::core::transport::TransportLayer;
use crate::error::{Error, Result};

/// In-memory transport recording every outbound peer list.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockUdpSocket {
    transmitted: Arc<Mutex<Vec<(String, Vec<PeerInfo>)>>>,
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    notify: Arc<Notify>,
    unreachable: Arc<Mutex<HashSet<String>>>,
}

impl MockUdpSocket {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn transmitted(&self) -> Vec<(String, Vec<PeerInfo>)> {
        let tx = self.transmitted.lock().await;
        (*tx).clone()
    }

    /// Queues a datagram to be returned by the next `recv_from`.
    pub(crate) async fn add_received(&self, datagram: Vec<u8>) {
        self.inbound.lock().await.push_back(datagram);
        self.notify.notify_one();
    }

    /// Makes every send to `target` fail.
    pub(crate) async fn add_unreachable(&self, target: impl Into<String>) {
        self.unreachable.lock().await.insert(target.into());
    }
}

#[async_trait]
impl TransportLayer for MockUdpSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, String)> {
        loop {
            if let Some(datagram) = self.inbound.lock().await.pop_front() {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                return Ok((len, "MockUdpSocket".to_string()));
            }
            self.notify.notified().await;
        }
    }

    async fn send_to(&self, buf: &[u8], target: &str) -> Result<usize> {
        if self.unreachable.lock().await.contains(target) {
            return Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{target} is unreachable"),
            )));
        }

        let peers = decode_peers(buf)?;
        self.transmitted
            .lock()
            .await
            .push((target.to_string(), peers));

        Ok(buf.len())
    }

    fn local_addr(&self) -> Result<String> {
        Ok("MockUdpSocket".to_string())
    }
}
