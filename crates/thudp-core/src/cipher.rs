//! AES-CBC block codec
//!
//! Key and IV are fixed for the lifetime of the codec and every datagram is
//! encrypted with a fresh CBC chain starting from the same IV. Identical
//! record prefixes therefore produce identical leading ciphertext blocks;
//! the wire format has no room for a per-message IV.
//!
//! No padding is added or removed here. Buffers must already be a whole
//! number of blocks, which [`crate::codec::encode`] guarantees.

use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;

use crate::codec;
use crate::types::Record;
use crate::{Error, Result, BLOCK_SIZE};

#[derive(Clone)]
enum CipherKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

impl CipherKey {
    fn from_slice(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(CipherKey::Aes128(to_array(key))),
            24 => Ok(CipherKey::Aes192(to_array(key))),
            32 => Ok(CipherKey::Aes256(to_array(key))),
            len => Err(Error::InvalidKeyLength(len)),
        }
    }

    fn bits(&self) -> usize {
        match self {
            CipherKey::Aes128(_) => 128,
            CipherKey::Aes192(_) => 192,
            CipherKey::Aes256(_) => 256,
        }
    }
}

fn to_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

/// Static-key AES-CBC codec shared by senders and receivers
#[derive(Clone)]
pub struct BlockCodec {
    key: CipherKey,
    iv: [u8; BLOCK_SIZE],
}

impl BlockCodec {
    /// Create a codec from raw key (16, 24 or 32 bytes) and IV (16 bytes)
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        let key = CipherKey::from_slice(key)?;
        if iv.len() != BLOCK_SIZE {
            return Err(Error::InvalidIvLength(iv.len()));
        }

        Ok(Self {
            key,
            iv: to_array(iv),
        })
    }

    /// Create a codec from base64 encoded key and IV
    pub fn from_base64(key: &str, iv: &str) -> Result<Self> {
        let key = STANDARD.decode(key.trim())?;
        let iv = STANDARD.decode(iv.trim())?;
        Self::new(&key, &iv)
    }

    /// AES key size in bits
    pub fn key_bits(&self) -> usize {
        self.key.bits()
    }

    /// Encrypt a block-aligned buffer in place
    pub fn encrypt_in_place(&self, buf: &mut [u8]) -> Result<()> {
        check_aligned(buf)?;
        let len = buf.len();
        let iv = &self.iv;

        let res = match &self.key {
            CipherKey::Aes128(k) => cbc::Encryptor::<Aes128>::new(k.into(), iv.into())
                .encrypt_padded_mut::<NoPadding>(buf, len)
                .map(|_| ()),
            CipherKey::Aes192(k) => cbc::Encryptor::<Aes192>::new(k.into(), iv.into())
                .encrypt_padded_mut::<NoPadding>(buf, len)
                .map(|_| ()),
            CipherKey::Aes256(k) => cbc::Encryptor::<Aes256>::new(k.into(), iv.into())
                .encrypt_padded_mut::<NoPadding>(buf, len)
                .map(|_| ()),
        };

        res.map_err(|_| Error::UnalignedBuffer(len))
    }

    /// Decrypt a block-aligned buffer in place
    pub fn decrypt_in_place(&self, buf: &mut [u8]) -> Result<()> {
        check_aligned(buf)?;
        let len = buf.len();
        let iv = &self.iv;

        let res = match &self.key {
            CipherKey::Aes128(k) => cbc::Decryptor::<Aes128>::new(k.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(buf)
                .map(|_| ()),
            CipherKey::Aes192(k) => cbc::Decryptor::<Aes192>::new(k.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(buf)
                .map(|_| ()),
            CipherKey::Aes256(k) => cbc::Decryptor::<Aes256>::new(k.into(), iv.into())
                .decrypt_padded_mut::<NoPadding>(buf)
                .map(|_| ()),
        };

        res.map_err(|_| Error::UnalignedBuffer(len))
    }

    /// Encrypt a copy of `cleartext`
    pub fn encrypt(&self, cleartext: &[u8]) -> Result<Bytes> {
        let mut buf = BytesMut::from(cleartext);
        self.encrypt_in_place(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decrypt a copy of `ciphertext`
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Bytes> {
        let mut buf = BytesMut::from(ciphertext);
        self.decrypt_in_place(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode and encrypt a record into a datagram payload
    pub fn seal(&self, record: &Record, secret: &[u8]) -> Result<Bytes> {
        let mut buf = codec::encode(record, secret);
        self.encrypt_in_place(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decrypt and decode a datagram payload
    pub fn open(&self, datagram: &[u8]) -> Result<(Record, Bytes)> {
        let cleartext = self.decrypt(datagram)?;
        codec::decode(&cleartext)
    }
}

impl fmt::Debug for BlockCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCodec")
            .field("key_bits", &self.key.bits())
            .finish_non_exhaustive()
    }
}

fn check_aligned(buf: &[u8]) -> Result<()> {
    if buf.is_empty() || buf.len() % BLOCK_SIZE != 0 {
        return Err(Error::UnalignedBuffer(buf.len()));
    }
    Ok(())
}
