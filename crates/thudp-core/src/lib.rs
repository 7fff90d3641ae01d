//! ThUDP Core
//!
//! Record layout, encoding and the encryption envelope for ThUDP, the
//! encrypted fixed-size datagram protocol spoken between heating controllers
//! and zone devices.
//!
//! This crate provides:
//! - Protocol command and record types ([`Command`], [`Record`])
//! - Fixed-layout record encoding/decoding ([`codec`])
//! - The AES-CBC block codec with a static key and IV ([`BlockCodec`])
//!
//! # Wire layout
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────────┐
//! │ Byte 0     │ Command ('?', '!', '#', '*')                 │
//! │ Bytes 1-10 │ Zone name, NUL padded                        │
//! │ Bytes 11-14│ Value (f32 little-endian, '!' only)          │
//! │ Bytes 15-18│ Setpoint (f32 little-endian, '!' only)       │
//! │ Bytes 19.. │ Secret + NUL, zero padded to 16 byte blocks  │
//! └────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! The whole buffer is then encrypted with AES-CBC. Datagrams in both
//! directions are exactly [`codec::record_size`] bytes long.

pub mod cipher;
pub mod codec;
pub mod error;
pub mod types;

pub use cipher::BlockCodec;
pub use codec::{decode, encode, record_size};
pub use error::{Error, Result};
pub use types::*;

/// Length of the zone name field
pub const ZONE_LEN: usize = 10;

/// Offset of the value field
pub const VALUE_OFFSET: usize = 1 + ZONE_LEN;

/// Offset of the setpoint field
pub const SETPOINT_OFFSET: usize = VALUE_OFFSET + 4;

/// Size of the fixed header (command, zone, value, setpoint); the secret starts here
pub const HEADER_SIZE: usize = SETPOINT_OFFSET + 4;

/// Cipher block size
pub const BLOCK_SIZE: usize = 16;

/// Default UDP port used by devices and controllers
pub const DEFAULT_PORT: u16 = 1024;

/// Environment variable holding the base64 cipher key
pub const KEY_ENV: &str = "UDP_KEY";

/// Environment variable holding the base64 initialization vector
pub const IV_ENV: &str = "UDP_IV";

/// Environment variable holding the shared secret
pub const SECRET_ENV: &str = "UDP_SECRET";
