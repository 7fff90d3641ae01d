//! Key material and network settings
//!
//! Each value is taken from the command line, then the environment, then
//! the TOML file given with `--config`, then the built-in default.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use clap::Args;
use serde::Deserialize;
use std::path::Path;
use thudp_core::{BlockCodec, DEFAULT_PORT, IV_ENV, KEY_ENV, SECRET_ENV};

/// Key used when none is configured
pub const DEFAULT_KEY: &[u8] = b"12345678901234567890123456789012";

/// IV used when none is configured
pub const DEFAULT_IV: &[u8] = b"1234567890123456";

pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Contents of a `--config` file
///
/// ```toml
/// key = "MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI="
/// iv = "MTIzNDU2Nzg5MDEyMzQ1Ng=="
/// secret = "shared"
/// port = 1024
/// bind = "0.0.0.0"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub key: Option<String>,
    pub iv: Option<String>,
    pub secret: Option<String>,
    pub port: Option<u16>,
    pub bind: Option<String>,
}

impl FileConfig {
    /// Load from `path`, or an empty config when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Cipher and secret options shared by all subcommands
#[derive(Debug, Default, Args)]
pub struct KeyArgs {
    /// Shared secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,

    /// Cipher key, base64 (16, 24 or 32 bytes)
    #[arg(long, env = KEY_ENV, hide_env_values = true)]
    pub key: Option<String>,

    /// Initialization vector, base64 (16 bytes)
    #[arg(long, env = IV_ENV, hide_env_values = true)]
    pub iv: Option<String>,
}

/// Socket options shared by all subcommands
#[derive(Debug, Default, Args)]
pub struct NetArgs {
    /// UDP port to send to and listen on [default: 1024]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// IP address to bind to [default: 0.0.0.0]
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Fully resolved settings
#[derive(Debug)]
pub struct Settings {
    pub codec: BlockCodec,
    pub secret: Bytes,
    pub port: u16,
    pub bind: String,
}

impl Settings {
    pub fn resolve(keys: &KeyArgs, net: &NetArgs, file: FileConfig) -> Result<Self> {
        let Some(secret) = keys.secret.clone().or(file.secret) else {
            bail!("No secret configured, use --secret or {}", SECRET_ENV);
        };

        let key = decode_or(keys.key.as_deref().or(file.key.as_deref()), DEFAULT_KEY)
            .context("Invalid key")?;
        let iv = decode_or(keys.iv.as_deref().or(file.iv.as_deref()), DEFAULT_IV)
            .context("Invalid IV")?;
        let codec = BlockCodec::new(&key, &iv)?;

        Ok(Self {
            codec,
            secret: Bytes::from(secret.into_bytes()),
            port: net.port.or(file.port).unwrap_or(DEFAULT_PORT),
            bind: net
                .bind
                .clone()
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
        })
    }
}

fn decode_or(encoded: Option<&str>, default: &[u8]) -> Result<Vec<u8>> {
    match encoded {
        Some(text) => Ok(STANDARD.decode(text.trim())?),
        None => Ok(default.to_vec()),
    }
}
