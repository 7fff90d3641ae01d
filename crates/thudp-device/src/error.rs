//! Device error types

use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceError>;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("invalid datagram from {from}: secret mismatch")]
    Authentication { from: SocketAddr },

    #[error("invalid zone name: {0:?}")]
    InvalidZone(String),

    #[error("invalid setpoint: {0}")]
    InvalidSetpoint(f32),

    #[error("transport error: {0}")]
    Transport(#[from] thudp_transport::TransportError),

    #[error("core protocol error: {0}")]
    Core(#[from] thudp_core::Error),
}
