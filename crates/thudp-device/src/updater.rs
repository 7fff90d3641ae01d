//! Periodic device to controller traffic
//!
//! A zone device that is not itself a controller keeps its zone table fresh
//! by subscribing at the controller every few seconds. A setpoint chosen on
//! the device is pushed every second until the controller echoes it back.

use std::net::SocketAddr;
use std::time::Duration;
use thudp_core::Record;
use thudp_transport::DatagramTransport;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::responder::Responder;

/// Update loop configuration
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Controller receiving the updates
    pub controller: SocketAddr,
    /// Delay between rounds when nothing is pending
    pub interval: Duration,
    /// Delay between rounds while a setpoint change awaits confirmation
    pub pending_interval: Duration,
}

impl UpdaterConfig {
    pub fn new(controller: SocketAddr) -> Self {
        Self {
            controller,
            interval: Duration::from_secs(5),
            pending_interval: Duration::from_secs(1),
        }
    }
}

impl<T: DatagramTransport> Responder<T> {
    /// Send updates to the controller until the future is dropped
    ///
    /// Each round pushes the pending setpoint (value NaN), if any, then a
    /// `*` record. Returns at once on a controller device.
    pub async fn run_updates(&self, updater: UpdaterConfig) -> Result<()> {
        if self.config.controller {
            debug!("controller device, periodic updates disabled");
            return Ok(());
        }

        info!("Sending updates to controller {}", updater.controller);

        loop {
            let pending = self.pending_setpoint();
            if let Some(p) = &pending {
                let record = Record::set(p.zone.as_str(), f32::NAN, p.setpoint);
                self.push(&record, updater.controller).await;
            }
            self.push(&Record::subscribe(), updater.controller).await;

            let delay = if pending.is_some() {
                updater.pending_interval
            } else {
                updater.interval
            };
            tokio::time::sleep(delay).await;
        }
    }

    async fn push(&self, record: &Record, target: SocketAddr) {
        let sent = match self.codec.seal(record, &self.secret) {
            Ok(data) => self.transport.send_to(&data, target).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match sent {
            Ok(()) => debug!("update {} sent to {}", record, target),
            Err(e) => error!("sendto {}: {}", target, e),
        }
    }
}
