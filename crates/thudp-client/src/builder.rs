//! Session builder pattern

use bytes::Bytes;
use std::time::Duration;
use thudp_core::BlockCodec;
use thudp_transport::{UdpConfig, UdpTransport};
use tracing::info;

use crate::error::{ClientError, Result};
use crate::session::Session;

/// Builder for a controller [`Session`]
pub struct SessionBuilder {
    destination: String,
    bind: String,
    broadcast: bool,
    reuse_address: bool,
    codec: Option<std::result::Result<BlockCodec, thudp_core::Error>>,
    secret: Option<Bytes>,
    insecure: bool,
    recv_timeout: Option<Duration>,
}

impl SessionBuilder {
    /// Create a new builder sending to `destination` (`host:port`)
    pub fn new(destination: &str) -> Self {
        Self {
            destination: destination.to_string(),
            bind: "0.0.0.0:0".to_string(),
            broadcast: false,
            reuse_address: false,
            codec: None,
            secret: None,
            insecure: false,
            recv_timeout: None,
        }
    }

    /// Local address to bind (default `0.0.0.0:0`)
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind = addr.to_string();
        self
    }

    /// Allow sending to broadcast destinations
    pub fn broadcast(mut self, enabled: bool) -> Self {
        self.broadcast = enabled;
        self
    }

    /// Set SO_REUSEADDR on the local socket (default off)
    pub fn reuse_address(mut self, enabled: bool) -> Self {
        self.reuse_address = enabled;
        self
    }

    /// Use an existing block codec
    pub fn codec(mut self, codec: BlockCodec) -> Self {
        self.codec = Some(Ok(codec));
        self
    }

    /// Raw key (16, 24 or 32 bytes) and IV (16 bytes)
    pub fn key_iv(mut self, key: &[u8], iv: &[u8]) -> Self {
        self.codec = Some(BlockCodec::new(key, iv));
        self
    }

    /// Base64 encoded key and IV
    pub fn key_iv_base64(mut self, key: &str, iv: &str) -> Self {
        self.codec = Some(BlockCodec::from_base64(key, iv));
        self
    }

    /// Shared secret embedded in every record
    pub fn secret(mut self, secret: impl Into<Bytes>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Report records with a mismatched secret instead of failing
    pub fn insecure(mut self, enabled: bool) -> Self {
        self.insecure = enabled;
        self
    }

    /// Bound every receive (default: wait indefinitely)
    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Validate configuration, bind the socket and create the session
    pub async fn connect(self) -> Result<Session> {
        let codec = self
            .codec
            .ok_or_else(|| ClientError::Config("no key material".to_string()))??;
        let secret = self
            .secret
            .ok_or_else(|| ClientError::Config("no secret".to_string()))?;

        let destination = tokio::net::lookup_host(&self.destination)
            .await
            .map_err(|e| ClientError::InvalidDestination(format!("{}: {}", self.destination, e)))?
            .next()
            .ok_or_else(|| ClientError::InvalidDestination(self.destination.clone()))?;

        let config = UdpConfig {
            broadcast: self.broadcast,
            reuse_address: self.reuse_address,
            ..Default::default()
        };
        let transport = UdpTransport::bind_with_config(&self.bind, config).await?;

        info!(
            "Session {} -> {} (AES-{})",
            transport.local_addr()?,
            destination,
            codec.key_bits()
        );

        Ok(Session::with_transport(transport, codec, secret, destination)
            .insecure(self.insecure)
            .recv_timeout(self.recv_timeout))
    }
}
