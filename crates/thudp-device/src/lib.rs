//! ThUDP Zone Device
//!
//! The device end of the protocol: answers queries and subscriptions with
//! the state of its heating zones, applies setpoints pushed by a controller
//! and, unless it is the controller, keeps subscribing at one.

pub mod error;
pub mod responder;
pub mod updater;
pub mod zones;

pub use error::{DeviceError, Result};
pub use responder::{DeviceConfig, DeviceEvent, PendingSetpoint, Responder};
pub use updater::UpdaterConfig;
pub use zones::{ZoneState, ZoneTable};
