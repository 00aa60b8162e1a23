//! UDP-backed channel adapter.
//!
//! [`UdpChannel`] implements [`Channel`] over a connected tokio UDP socket.
//! Sends are non-blocking and fire-and-forget: a full socket buffer or a
//! transient error simply drops the datagram, which the protocol engine
//! absorbs through its retransmission timer. The engine itself stays
//! synchronous; only receiving awaits.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::trace;

use crate::core::constants::MAX_SEGMENT_SIZE;
use crate::core::Channel;

/// Datagram channel over a connected UDP socket.
#[derive(Debug, Clone)]
pub struct UdpChannel {
    socket: Arc<UdpSocket>,
}

impl UdpChannel {
    /// Bind a local UDP socket and connect it to the peer.
    pub async fn connect(local: SocketAddr, peer: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        Ok(Self::from_socket(socket))
    }

    /// Wrap an already-connected UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
        }
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive one datagram into `buf`, returning its length.
    ///
    /// Cancel-safe; a buffer of [`MAX_SEGMENT_SIZE`] bytes always suffices
    /// for a valid segment.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }

    /// Maximum datagram size this channel is expected to carry.
    pub fn max_datagram_size(&self) -> usize {
        MAX_SEGMENT_SIZE
    }
}

impl Channel for UdpChannel {
    fn transmit(&mut self, segment: &[u8]) {
        if let Err(err) = self.socket.try_send(segment) {
            trace!(%err, "datagram dropped on send");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pair() -> (UdpChannel, UdpChannel) {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        a.connect(b.local_addr().unwrap()).await.unwrap();
        b.connect(a.local_addr().unwrap()).await.unwrap();
        (UdpChannel::from_socket(a), UdpChannel::from_socket(b))
    }

    #[tokio::test]
    async fn test_transmit_recv_roundtrip() {
        let (mut a, b) = pair().await;

        a.transmit(b"strand segment");

        let mut buf = [0u8; MAX_SEGMENT_SIZE];
        let n = b.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"strand segment");
    }

    #[tokio::test]
    async fn test_connect_binds_to_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let channel = UdpChannel::connect(
            "127.0.0.1:0".parse().unwrap(),
            peer.local_addr().unwrap(),
        )
        .await
        .unwrap();

        assert_ne!(channel.local_addr().unwrap().port(), 0);
    }
}
