//! ThUDP Client Library
//!
//! Controller side of ThUDP: builds records, encrypts and sends them, and
//! drives the reply pattern each command calls for.
//!
//! # Example
//!
//! ```ignore
//! use thudp_client::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = Session::builder("192.168.1.20:1024")
//!         .key_iv_base64(&key, &iv)
//!         .secret("shared")
//!         .connect()
//!         .await?;
//!
//!     // Push a setpoint (no reply)
//!     session.set("kitchen", f32::NAN, 21.5).await?;
//!
//!     // Read one zone back
//!     let report = session.query("kitchen").await?;
//!     println!("{}", report.record);
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod session;

pub use builder::SessionBuilder;
pub use error::{ClientError, Result};
pub use session::{Report, Session, SessionState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::SessionBuilder;
    pub use crate::error::{ClientError, Result};
    pub use crate::session::{Report, Session, SessionState};
    pub use thudp_core::{BlockCodec, Command, Record};
}
