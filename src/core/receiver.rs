use std::sync::Arc;

use crate::error::Result;

use super::detection::Members;
use super::message::decode_peers;
use super::transport::TransportLayer;

/// Accepts inbound peer lists and feeds every record through the heartbeat merge.
#[derive(Debug)]
pub(crate) struct MessageReceiver<T: TransportLayer> {
    socket: Arc<T>,
    members: Arc<Members>,
}

impl<T: TransportLayer> MessageReceiver<T> {
    pub(crate) fn new(socket: Arc<T>, members: Arc<Members>) -> Self {
        Self { socket, members }
    }

    /// Receives one datagram into `buf` and applies it, returning the number of records
    /// it carried. Undecodable datagrams are rejected here and never reach the detector.
    pub(crate) async fn dispatch(&self, buf: &mut [u8]) -> Result<usize> {
        let (len, from) = self.socket.recv_from(buf).await?;
        let peers = decode_peers(&buf[..len])?;

        tracing::trace!(
            "[{}] received {} peers from {}",
            self.members.me(),
            peers.len(),
            from
        );

        let count = peers.len();
        self.members.merge(peers);

        Ok(count)
    }
}
