//! Error types for ThUDP records and the block codec

use thiserror::Error;

/// Result type alias for ThUDP core operations
pub type Result<T> = std::result::Result<T, Error>;

/// ThUDP core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Decrypted buffer cannot hold the fixed header and secret terminator
    #[error("malformed record: need at least {needed} bytes, have {have}")]
    MalformedRecord { needed: usize, have: usize },

    /// Cipher key is not 16, 24 or 32 bytes
    #[error("invalid key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),

    /// Initialization vector is not one cipher block
    #[error("invalid iv length: {0} bytes (expected 16)")]
    InvalidIvLength(usize),

    /// Buffer handed to the block codec is not a whole number of blocks
    #[error("buffer length {0} is not a multiple of the 16 byte block size")]
    UnalignedBuffer(usize),

    /// Key material could not be base64 decoded
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// Command could not be parsed from text
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::InvalidBase64(e.to_string())
    }
}
