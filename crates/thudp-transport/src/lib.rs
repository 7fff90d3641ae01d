//! ThUDP Transport Layer
//!
//! Connectionless datagram transport for ThUDP. Every datagram in either
//! direction has the same fixed size, derived from the secret length; the
//! transport rejects anything else instead of truncating or reassembling.

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::DatagramTransport;
pub use udp::{UdpConfig, UdpTransport};
