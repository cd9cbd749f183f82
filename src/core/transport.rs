//! # Transport Layer Module
//!
//! Datagram transport used to exchange peer lists. The membership core only ever sees
//! decoded peer records; this trait is the seam where bytes enter and leave a node.
use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::error::Result;

/// Abstracts the unreliable, message-oriented transport gossip runs on.
#[async_trait]
pub trait TransportLayer: Send + Sync {
    /// Receives one datagram into `buf`, returning its length and the sender address.
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, String)>;

    /// Sends `buf` as one datagram to `target` (`host:port`).
    async fn send_to(&self, buf: &[u8], target: &str) -> Result<usize>;

    /// Retrieves the local address the transport is bound to.
    fn local_addr(&self) -> Result<String>;
}

#[async_trait]
impl TransportLayer for UdpSocket {
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, String)> {
        let (len, from) = UdpSocket::recv_from(self, buf).await?;
        Ok((len, from.to_string()))
    }

    async fn send_to(&self, buf: &[u8], target: &str) -> Result<usize> {
        Ok(UdpSocket::send_to(self, buf, target).await?)
    }

    fn local_addr(&self) -> Result<String> {
        let addr = UdpSocket::local_addr(self)?;
        Ok(addr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::UdpSocket;

    use super::TransportLayer;

    #[tokio::test]
    async fn test_udp_transport_send_and_receive() {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b_addr = TransportLayer::local_addr(&b).unwrap();

        let sent = TransportLayer::send_to(&a, b"hello", &b_addr).await.unwrap();
        assert_eq!(sent, 5);

        let mut buf = [0u8; 16];
        let (len, from) = TransportLayer::recv_from(&b, &mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello");
        assert_eq!(from, TransportLayer::local_addr(&a).unwrap());
    }
}
