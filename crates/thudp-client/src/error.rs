//! Client error types

use std::net::SocketAddr;
use thiserror::Error;
use thudp_transport::TransportError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: secret mismatch in record from {from}")]
    Authentication { from: SocketAddr },

    #[error("timeout waiting for reply")]
    Timeout,

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] thudp_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Errors confined to one received datagram; a streaming session skips them
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(TransportError::Framing { .. })
                | ClientError::Transport(TransportError::ReceiveFailed(_))
                | ClientError::Protocol(thudp_core::Error::MalformedRecord { .. })
        )
    }
}
