//! Transport error types

use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind to {addr} failed: {reason}")]
    BindFailed { addr: String, reason: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Datagram length differs from the fixed record size
    #[error("framing error: expected {expected} byte datagram from {from}, got {actual}")]
    Framing {
        expected: usize,
        actual: usize,
        from: SocketAddr,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Errors confined to a single datagram; the socket stays usable
    pub fn is_framing(&self) -> bool {
        matches!(self, TransportError::Framing { .. })
    }
}
