//! ThUDP record codec
//!
//! Converts between a [`Record`] plus the shared secret and the fixed-size
//! cleartext buffer that goes into the block codec. The buffer is always a
//! whole number of cipher blocks; trailing bytes are zero, there is no
//! padding marker to strip on the way back.

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::{Command, Record};
use crate::{Error, Result, BLOCK_SIZE, HEADER_SIZE, SETPOINT_OFFSET, VALUE_OFFSET, ZONE_LEN};

/// Round `len` up to a whole number of cipher blocks (at least one)
#[inline]
pub fn padded_size(len: usize) -> usize {
    len.max(1).div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Size of an encoded record (and of every datagram) for a secret of `secret_len` bytes
#[inline]
pub fn record_size(secret_len: usize) -> usize {
    padded_size(HEADER_SIZE + secret_len + 1)
}

/// Encode a record and the shared secret into a zero padded cleartext buffer
///
/// Zone names longer than [`ZONE_LEN`] bytes are truncated. Value and
/// setpoint are written only for [`Command::Set`].
pub fn encode(record: &Record, secret: &[u8]) -> BytesMut {
    let size = record_size(secret.len());
    let mut buf = BytesMut::with_capacity(size);

    buf.put_u8(record.command.as_byte());

    let zone = record.zone.as_bytes();
    let zone = &zone[..zone.len().min(ZONE_LEN)];
    buf.put_slice(zone);
    buf.put_bytes(0, ZONE_LEN - zone.len());

    if record.command.carries_payload() {
        buf.put_f32_le(record.value);
        buf.put_f32_le(record.setpoint);
    } else {
        buf.put_bytes(0, 8);
    }

    buf.put_slice(secret);
    buf.put_u8(0);

    let padding = size - buf.len();
    buf.put_bytes(0, padding);
    buf
}

/// Decode a cleartext buffer into a record and the secret it carries
///
/// Value and setpoint are decoded whatever the command is. The secret runs
/// from the end of the header to the first NUL.
pub fn decode(bytes: &[u8]) -> Result<(Record, Bytes)> {
    if bytes.len() < HEADER_SIZE + 1 {
        return Err(Error::MalformedRecord {
            needed: HEADER_SIZE + 1,
            have: bytes.len(),
        });
    }

    let command = Command::from_byte(bytes[0]);
    let zone = String::from_utf8_lossy(until_nul(&bytes[1..VALUE_OFFSET])).into_owned();
    let value = read_f32_le(&bytes[VALUE_OFFSET..SETPOINT_OFFSET]);
    let setpoint = read_f32_le(&bytes[SETPOINT_OFFSET..HEADER_SIZE]);
    let secret = Bytes::copy_from_slice(until_nul(&bytes[HEADER_SIZE..]));

    Ok((
        Record {
            command,
            zone,
            value,
            setpoint,
        },
        secret,
    ))
}

/// Byte-for-byte comparison of a decoded secret against the configured one
#[inline]
pub fn secret_matches(decoded: &[u8], expected: &[u8]) -> bool {
    decoded == expected
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

fn read_f32_le(bytes: &[u8]) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    f32::from_le_bytes(raw)
}
