//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

use crate::error::Result;

/// Fixed-size datagram transport
///
/// Implemented by [`crate::UdpTransport`]; sessions are generic over it so
/// the interaction logic can run against other sockets.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram, no retry
    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()>;

    /// Wait for one datagram of exactly `expected_size` bytes
    ///
    /// A datagram of any other length is consumed and reported as
    /// [`crate::TransportError::Framing`].
    async fn recv_frame(&self, expected_size: usize) -> Result<(Bytes, SocketAddr)>;

    /// Get the local address
    fn local_addr(&self) -> Result<SocketAddr>;
}
