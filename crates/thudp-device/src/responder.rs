//! Zone device responder
//!
//! Listens for ThUDP datagrams and acts on them:
//! - `?` replies with a `!` record for the named zone (unknown zones are ignored)
//! - `*` replies with one `!` record per known zone
//! - `!` updates a zone, creating it on first use
//! - `#` asks the host to restart the device
//!
//! Replies go back to the requester's IP, either to its source port or to a
//! fixed reply port. Datagrams of the wrong size or with a foreign secret
//! are dropped without a reply.

use bytes::Bytes;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use thudp_core::codec::{record_size, secret_matches};
use thudp_core::{BlockCodec, Command, Record, DEFAULT_PORT};
use thudp_transport::{DatagramTransport, TransportError, UdpConfig, UdpTransport};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{DeviceError, Result};
use crate::zones::{validate_name, ZoneState, ZoneTable};

/// Responder configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Bind address for the UDP socket
    pub bind_addr: String,
    /// Port replies are sent to; `None` replies to the requester's source port
    pub reply_port: Option<u16>,
    /// A controller collects values itself and only accepts setpoints
    pub controller: bool,
    /// Setpoints above this (plus 0.1) are ignored
    pub max_setpoint: f32,
    /// Process datagrams whose secret does not match
    pub insecure: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            reply_port: Some(DEFAULT_PORT),
            controller: false,
            max_setpoint: 25.0,
            insecure: false,
        }
    }
}

/// Notifications emitted by the responder
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A `!` record changed a zone
    ZoneUpdated {
        zone: String,
        value: f32,
        setpoint: f32,
    },
    /// A `#` record was received
    RestartRequested { from: SocketAddr },
}

/// Zone device responder
pub struct Responder<T: DatagramTransport = UdpTransport> {
    pub(crate) config: DeviceConfig,
    pub(crate) transport: T,
    pub(crate) codec: BlockCodec,
    pub(crate) secret: Bytes,
    zones: Arc<ZoneTable>,
    events: mpsc::Sender<DeviceEvent>,
    /// Local setpoint change not yet confirmed by the controller
    pub(crate) pending: Mutex<Option<PendingSetpoint>>,
}

/// A setpoint chosen on the device, pushed until the controller echoes it
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSetpoint {
    pub zone: String,
    pub setpoint: f32,
}

impl Responder<UdpTransport> {
    /// Bind the configured address and create a responder
    pub async fn bind(
        config: DeviceConfig,
        codec: BlockCodec,
        secret: impl Into<Bytes>,
    ) -> Result<(Self, mpsc::Receiver<DeviceEvent>)> {
        let udp = UdpConfig {
            reuse_address: true,
            ..Default::default()
        };
        let transport = UdpTransport::bind_with_config(&config.bind_addr, udp).await?;
        info!("Zone device listening on {}", transport.local_addr()?);
        Ok(Self::with_transport(config, transport, codec, secret))
    }
}

impl<T: DatagramTransport> Responder<T> {
    /// Create a responder over an already bound transport
    pub fn with_transport(
        config: DeviceConfig,
        transport: T,
        codec: BlockCodec,
        secret: impl Into<Bytes>,
    ) -> (Self, mpsc::Receiver<DeviceEvent>) {
        let (events, rx) = mpsc::channel(100);
        let responder = Self {
            config,
            transport,
            codec,
            secret: secret.into(),
            zones: Arc::new(ZoneTable::new()),
            events,
            pending: Mutex::new(None),
        };
        (responder, rx)
    }

    /// Zone table shared with the host application
    pub fn zones(&self) -> Arc<ZoneTable> {
        Arc::clone(&self.zones)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.transport.local_addr()?)
    }

    /// Ask the controller to adopt a new setpoint for `zone`
    ///
    /// The request is repeated by [`Responder::run_updates`] until a `!`
    /// record carrying the same setpoint comes back.
    pub fn request_setpoint(&self, zone: &str, setpoint: f32) -> Result<()> {
        validate_name(zone)?;
        if setpoint.is_nan() {
            return Err(DeviceError::InvalidSetpoint(setpoint));
        }
        *self.pending.lock() = Some(PendingSetpoint {
            zone: zone.to_string(),
            setpoint,
        });
        Ok(())
    }

    pub fn pending_setpoint(&self) -> Option<PendingSetpoint> {
        self.pending.lock().clone()
    }

    /// Receive and handle datagrams until the socket fails
    pub async fn run(&self) -> Result<()> {
        let size = record_size(self.secret.len());

        loop {
            match self.transport.recv_frame(size).await {
                Ok((data, from)) => match self.handle_datagram(&data, from).await {
                    Ok(_) => {}
                    Err(DeviceError::Authentication { from }) => {
                        info!("invalid datagram from {}", from);
                    }
                    Err(e) => warn!("datagram from {} rejected: {}", from, e),
                },
                Err(e @ TransportError::Framing { .. }) => debug!("dropping datagram: {}", e),
                Err(TransportError::ReceiveFailed(e)) => warn!("receive failed: {}", e),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Handle one full-size datagram, returning the number of replies sent
    pub async fn handle_datagram(&self, data: &[u8], from: SocketAddr) -> Result<usize> {
        let (record, secret) = self.codec.open(data)?;

        if !secret_matches(&secret, &self.secret) {
            if !self.config.insecure {
                return Err(DeviceError::Authentication { from });
            }
            warn!("accepting datagram from {} with mismatched secret", from);
        }

        match record.command {
            Command::Query => match self.zones.get(&record.zone) {
                Some(state) => Ok(self.reply(&record.zone, state, from).await),
                None => {
                    debug!("query for unknown zone {:?} from {}", record.zone, from);
                    Ok(0)
                }
            },
            Command::Subscribe => {
                let mut sent = 0;
                for (zone, state) in self.zones.snapshot() {
                    sent += self.reply(&zone, state, from).await;
                }
                Ok(sent)
            }
            Command::Set => {
                self.apply_set(&record)?;
                Ok(0)
            }
            Command::Broadcast => {
                info!("restart requested by {}", from);
                self.emit(DeviceEvent::RestartRequested { from });
                Ok(0)
            }
            Command::Unknown(byte) => {
                warn!(
                    "received unknown request type '{}' from {}",
                    byte.escape_ascii(),
                    from
                );
                Ok(0)
            }
        }
    }

    fn apply_set(&self, record: &Record) -> Result<()> {
        // A controller gathers values itself; remote values could be tampered with
        let value = (!self.config.controller && !record.value.is_nan()).then_some(record.value);

        let setpoint = if record.setpoint.is_nan() {
            None
        } else if record.setpoint <= self.config.max_setpoint + 0.1 {
            Some(record.setpoint)
        } else {
            debug!(
                "ignoring setpoint {:.1} for {} (max {:.1})",
                record.setpoint, record.zone, self.config.max_setpoint
            );
            None
        };

        let before = self.zones.get(&record.zone);
        let state = self.zones.apply(&record.zone, value, setpoint)?;

        if !record.setpoint.is_nan() {
            self.confirm_pending(&record.zone, record.setpoint);
        }

        if before.map_or(true, |b| !same_state(&b, &state)) {
            debug!(
                "zone {} val={:.1} set={:.1}",
                record.zone, state.value, state.setpoint
            );
            self.emit(DeviceEvent::ZoneUpdated {
                zone: record.zone.clone(),
                value: state.value,
                setpoint: state.setpoint,
            });
        }
        Ok(())
    }

    async fn reply(&self, zone: &str, state: ZoneState, from: SocketAddr) -> usize {
        let target = match self.config.reply_port {
            Some(port) => SocketAddr::new(from.ip(), port),
            None => from,
        };

        let record = Record::set(zone, state.value, state.setpoint);
        let sent = match self.codec.seal(&record, &self.secret) {
            Ok(data) => self.transport.send_to(&data, target).await.map_err(DeviceError::from),
            Err(e) => Err(e.into()),
        };

        match sent {
            Ok(()) => {
                debug!("sending '{}' to {}", zone, target);
                1
            }
            Err(e) => {
                error!("sendto {}: {}", target, e);
                0
            }
        }
    }

    fn confirm_pending(&self, zone: &str, setpoint: f32) {
        let mut pending = self.pending.lock();
        if pending
            .as_ref()
            .is_some_and(|p| p.zone == zone && p.setpoint == setpoint)
        {
            debug!("controller confirmed setpoint {:.1} for {}", setpoint, zone);
            *pending = None;
        }
    }

    pub(crate) fn emit(&self, event: DeviceEvent) {
        if self.events.try_send(event).is_err() {
            debug!("device event dropped, no listener");
        }
    }
}

fn same_state(a: &ZoneState, b: &ZoneState) -> bool {
    a.value.to_bits() == b.value.to_bits() && a.setpoint.to_bits() == b.setpoint.to_bits()
}
