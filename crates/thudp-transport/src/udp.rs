//! UDP transport implementation

use async_trait::async_trait;
use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::DatagramTransport;

/// UDP configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Receive buffer; must exceed any accepted frame so oversize datagrams are detected
    pub max_packet_size: usize,
    /// Permit sending to broadcast destinations
    pub broadcast: bool,
    /// Set SO_REUSEADDR before binding (off: a taken port is a bind error)
    pub reuse_address: bool,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 65507, // Max UDP payload
            broadcast: false,
            reuse_address: false,
        }
    }
}

/// UDP transport (connectionless)
///
/// Owns one socket; it is closed when the transport is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    config: UdpConfig,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::default()).await
    }

    /// Bind with config
    pub async fn bind_with_config(addr: &str, config: UdpConfig) -> Result<Self> {
        let bind_failed = |reason: String| TransportError::BindFailed {
            addr: addr.to_string(),
            reason,
        };

        let local = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| bind_failed(e.to_string()))?
            .next()
            .ok_or_else(|| bind_failed("address did not resolve".to_string()))?;

        let socket = open_socket(local, &config).map_err(|e| bind_failed(e.to_string()))?;

        info!("UDP bound to {}", socket.local_addr()?);

        Ok(Self { socket, config })
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Enable broadcast
    pub fn set_broadcast(&self, enable: bool) -> Result<()> {
        self.socket.set_broadcast(enable).map_err(TransportError::Io)
    }

    /// Send to a specific address
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, target)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        debug!("UDP sent {} bytes to {}", data.len(), target);
        Ok(())
    }

    /// Receive one datagram of exactly `expected_size` bytes
    pub async fn recv_frame(&self, expected_size: usize) -> Result<(Bytes, SocketAddr)> {
        let mut buf = vec![0u8; self.config.max_packet_size.max(expected_size + 1)];

        let (len, from) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        debug!("UDP received {} bytes from {}", len, from);

        if len != expected_size {
            return Err(TransportError::Framing {
                expected: expected_size,
                actual: len,
                from,
            });
        }

        buf.truncate(len);
        Ok((Bytes::from(buf), from))
    }
}

fn open_socket(local: SocketAddr, config: &UdpConfig) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(config.reuse_address)?;
    socket.set_broadcast(config.broadcast)?;
    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;
    UdpSocket::from_std(socket.into())
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        UdpTransport::send_to(self, data, target).await
    }

    async fn recv_frame(&self, expected_size: usize) -> Result<(Bytes, SocketAddr)> {
        UdpTransport::recv_frame(self, expected_size).await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        UdpTransport::local_addr(self)
    }
}
