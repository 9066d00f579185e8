//! Datagram socket seam used by the transaction engine.
//!
//! The engine only needs to send a datagram to an address and read the next
//! datagram back. Deadlines are applied by the caller around each call, so
//! implementations can be plain async sockets or scripted test doubles.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Caller-owned UDP socket abstraction
#[async_trait]
pub trait StunSocket: Send + Sync {
    /// Send one datagram to `target`
    ///
    /// # Errors
    /// Returns the underlying I/O error if the send fails
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Receive the next datagram into `buf`
    ///
    /// # Errors
    /// Returns the underlying I/O error if the receive fails
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

#[async_trait]
impl StunSocket for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }
}
