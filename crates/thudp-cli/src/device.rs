//! `thudp device`: run a zone device responder

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::net::{IpAddr, SocketAddr};
use thudp_core::ZONE_LEN;
use thudp_device::{DeviceConfig, DeviceEvent, Responder, UpdaterConfig};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{FileConfig, KeyArgs, NetArgs, Settings};

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Zone to serve, with an optional initial setpoint (name[=setpoint])
    #[arg(short, long = "zone", value_parser = parse_zone)]
    pub zones: Vec<ZoneSpec>,

    /// Port replies are sent to [default: same as --port]
    #[arg(long)]
    pub reply_port: Option<u16>,

    /// Reply to the requester's source port instead of a fixed port
    #[arg(long, conflicts_with = "reply_port")]
    pub reply_to_source: bool,

    /// Act as a controller: only setpoints are accepted from the network
    #[arg(long)]
    pub controller: bool,

    /// Highest setpoint accepted
    #[arg(long, default_value_t = 25.0)]
    pub max_setpoint: f32,

    /// Process requests carrying a different secret
    #[arg(long)]
    pub insecure: bool,

    /// Controller to subscribe at periodically (ip or ip:port) [port default: --port]
    #[arg(long, conflicts_with = "controller")]
    pub controller_addr: Option<String>,

    /// Setpoint to push to the controller until confirmed (zone=setpoint)
    #[arg(long, requires = "controller_addr", value_parser = parse_request)]
    pub request_setpoint: Option<ZoneSpec>,

    #[command(flatten)]
    pub net: NetArgs,

    #[command(flatten)]
    pub keys: KeyArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSpec {
    pub name: String,
    pub setpoint: f32,
}

fn parse_zone(s: &str) -> std::result::Result<ZoneSpec, String> {
    let (name, setpoint) = match s.split_once('=') {
        Some((name, set)) => {
            let setpoint = set
                .trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid setpoint '{}': {}", set, e))?;
            (name.trim(), setpoint)
        }
        None => (s.trim(), f32::NAN),
    };

    if name.is_empty() || name.len() > ZONE_LEN {
        return Err(format!(
            "zone name must be 1 to {} bytes, got '{}'",
            ZONE_LEN, name
        ));
    }

    Ok(ZoneSpec {
        name: name.to_string(),
        setpoint,
    })
}

fn parse_request(s: &str) -> std::result::Result<ZoneSpec, String> {
    let spec = parse_zone(s)?;
    if spec.setpoint.is_nan() {
        return Err(format!("'{}' needs a setpoint (zone=setpoint)", s));
    }
    Ok(spec)
}

/// Resolve `ip` or `ip:port`, defaulting the port
fn controller_target(addr: &str, default_port: u16) -> Result<SocketAddr> {
    if let Ok(sa) = addr.parse::<SocketAddr>() {
        return Ok(sa);
    }
    let ip: IpAddr = addr
        .parse()
        .with_context(|| format!("Invalid controller address: {}", addr))?;
    Ok(SocketAddr::new(ip, default_port))
}

impl DeviceArgs {
    fn device_config(&self, settings: &Settings) -> DeviceConfig {
        let reply_port = if self.reply_to_source {
            None
        } else {
            Some(self.reply_port.unwrap_or(settings.port))
        };

        DeviceConfig {
            bind_addr: format!("{}:{}", settings.bind, settings.port),
            reply_port,
            controller: self.controller,
            max_setpoint: self.max_setpoint,
            insecure: self.insecure,
        }
    }
}

/// Serve zones until Ctrl+C or a restart request
pub async fn run(
    args: DeviceArgs,
    file: FileConfig,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let settings = Settings::resolve(&args.keys, &args.net, file)?;
    let config = args.device_config(&settings);
    let bind_addr = config.bind_addr.clone();

    let (responder, mut events) = Responder::bind(config, settings.codec, settings.secret)
        .await
        .with_context(|| format!("Failed to start zone device on {}", bind_addr))?;

    let zones = responder.zones();
    for zone in &args.zones {
        zones.insert(&zone.name, zone.setpoint)?;
    }

    let updater = match &args.controller_addr {
        Some(addr) => Some(UpdaterConfig::new(controller_target(addr, settings.port)?)),
        None => None,
    };
    if let Some(request) = &args.request_setpoint {
        responder.request_setpoint(&request.name, request.setpoint)?;
    }

    println!(
        "{} Zone device listening on {} ({} zones{})",
        "THUDP".cyan().bold(),
        responder.local_addr()?,
        zones.len(),
        if args.controller { ", controller" } else { "" }
    );

    tokio::select! {
        result = responder.run() => {
            result?;
        }
        result = async {
            match updater {
                Some(updater) => responder.run_updates(updater).await,
                None => std::future::pending().await,
            }
        } => {
            result?;
        }
        _ = watch_events(&mut events) => {}
        _ = shutdown_rx.recv() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Print device events; returns once a restart is requested
async fn watch_events(events: &mut mpsc::Receiver<DeviceEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            DeviceEvent::ZoneUpdated {
                zone,
                value,
                setpoint,
            } => {
                println!(
                    "{} {} val={} set={}",
                    "UPDATE".green().bold(),
                    zone,
                    value,
                    setpoint
                );
            }
            DeviceEvent::RestartRequested { from } => {
                println!("{} requested by {}", "RESTART".yellow().bold(), from);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thudp_core::BlockCodec;

    #[test]
    fn test_parse_zone() {
        assert_eq!(
            parse_zone("kitchen=21.5").unwrap(),
            ZoneSpec {
                name: "kitchen".to_string(),
                setpoint: 21.5
            }
        );

        let bare = parse_zone("hall").unwrap();
        assert_eq!(bare.name, "hall");
        assert!(bare.setpoint.is_nan());

        assert!(parse_zone("").is_err());
        assert!(parse_zone("=20").is_err());
        assert!(parse_zone("livingroom1=20").is_err());
        assert!(parse_zone("hall=warm").is_err());
    }

    fn settings() -> Settings {
        Settings {
            codec: BlockCodec::new(&[0u8; 32], &[0u8; 16]).unwrap(),
            secret: bytes::Bytes::from_static(b"s"),
            port: 2048,
            bind: "127.0.0.1".to_string(),
        }
    }

    fn args() -> DeviceArgs {
        DeviceArgs {
            zones: Vec::new(),
            reply_port: None,
            reply_to_source: false,
            controller: false,
            max_setpoint: 25.0,
            insecure: false,
            controller_addr: None,
            request_setpoint: None,
            net: NetArgs::default(),
            keys: KeyArgs::default(),
        }
    }

    #[test]
    fn test_reply_port_defaults_to_listen_port() {
        let config = args().device_config(&settings());
        assert_eq!(config.bind_addr, "127.0.0.1:2048");
        assert_eq!(config.reply_port, Some(2048));

        let config = DeviceArgs {
            reply_port: Some(3000),
            ..args()
        }
        .device_config(&settings());
        assert_eq!(config.reply_port, Some(3000));

        let config = DeviceArgs {
            reply_to_source: true,
            ..args()
        }
        .device_config(&settings());
        assert_eq!(config.reply_port, None);
    }

    #[test]
    fn test_controller_target() {
        assert_eq!(
            controller_target("192.168.1.10", 1024).unwrap(),
            "192.168.1.10:1024".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            controller_target("192.168.1.10:2000", 1024).unwrap(),
            "192.168.1.10:2000".parse::<SocketAddr>().unwrap()
        );
        assert!(controller_target("controller.local", 1024).is_err());
    }

    #[test]
    fn test_parse_request_needs_setpoint() {
        assert_eq!(
            parse_request("hall=21").unwrap(),
            ZoneSpec {
                name: "hall".to_string(),
                setpoint: 21.0
            }
        );
        assert!(parse_request("hall").is_err());
        assert!(parse_request("hall=NaN").is_err());
    }
}
