//! Controller session
//!
//! One exchange at a time, driven by the command of the outgoing record:
//!
//! ```text
//! Set / Broadcast:  Idle ─send─▶ Sent ─▶ Done
//! Query:            Idle ─send─▶ Sent ─▶ AwaitingReply ─recv─▶ Done
//! Subscribe:        Idle ─send─▶ Sent ─▶ Streaming ─recv─▶ Streaming ...
//! ```
//!
//! A subscription only ends when its future is dropped or a fatal error
//! occurs; there is no in-band cancellation. Every received record is
//! checked against the configured secret.

use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use thudp_core::codec::{record_size, secret_matches};
use thudp_core::{BlockCodec, Command, Record, ReplyMode};
use thudp_transport::{DatagramTransport, UdpTransport};
use tracing::{debug, warn};

use crate::builder::SessionBuilder;
use crate::error::{ClientError, Result};

/// Position in the exchange state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sent,
    AwaitingReply,
    Streaming,
    Done,
}

/// A decoded record received by a session
#[derive(Debug, Clone)]
pub struct Report {
    pub record: Record,
    /// Secret carried by the record
    pub secret: Bytes,
    pub source: SocketAddr,
    /// False only for records accepted in insecure mode
    pub authenticated: bool,
}

/// A controller session over one socket
pub struct Session<T: DatagramTransport = UdpTransport> {
    transport: T,
    codec: BlockCodec,
    secret: Bytes,
    destination: SocketAddr,
    insecure: bool,
    recv_timeout: Option<Duration>,
    state: SessionState,
}

impl Session<UdpTransport> {
    /// Create a builder
    pub fn builder(destination: &str) -> SessionBuilder {
        SessionBuilder::new(destination)
    }
}

impl<T: DatagramTransport> Session<T> {
    /// Create a session over an already bound transport
    pub fn with_transport(
        transport: T,
        codec: BlockCodec,
        secret: impl Into<Bytes>,
        destination: SocketAddr,
    ) -> Self {
        Self {
            transport,
            codec,
            secret: secret.into(),
            destination,
            insecure: false,
            recv_timeout: None,
            state: SessionState::Idle,
        }
    }

    /// Report records with a mismatched secret instead of failing
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Bound every receive; `None` waits indefinitely
    pub fn recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Size of every datagram this session sends and accepts
    pub fn frame_size(&self) -> usize {
        record_size(self.secret.len())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Push a value and setpoint; no reply is awaited
    pub async fn set(&mut self, zone: &str, value: f32, setpoint: f32) -> Result<()> {
        self.execute(Record::set(zone, value, setpoint), |_| {}).await
    }

    /// Send a broadcast record; no reply is awaited
    pub async fn broadcast(&mut self, zone: &str) -> Result<()> {
        self.execute(Record::broadcast(zone), |_| {}).await
    }

    /// Query one zone and wait for exactly one reply
    pub async fn query(&mut self, zone: &str) -> Result<Report> {
        self.begin(&Record::query(zone)).await?;
        self.transition(SessionState::AwaitingReply);
        let report = self.receive_one().await;
        self.transition(SessionState::Done);
        report
    }

    /// Subscribe and report every reply until the future is dropped
    ///
    /// Failed receives, datagrams of the wrong size and malformed records
    /// are skipped; any other error ends the subscription.
    pub async fn subscribe<F>(&mut self, zone: &str, on_report: F) -> Result<()>
    where
        F: FnMut(Report),
    {
        let mut record = Record::subscribe();
        record.zone = zone.to_string();
        self.execute(record, on_report).await
    }

    /// Send `record` and run the reply pattern its command calls for
    pub async fn execute<F>(&mut self, record: Record, mut on_report: F) -> Result<()>
    where
        F: FnMut(Report),
    {
        if let Command::Unknown(byte) = record.command {
            warn!(
                "command '{}' has no defined reply behavior, sending without waiting",
                byte.escape_ascii()
            );
        }

        self.begin(&record).await?;

        match record.command.reply_mode() {
            ReplyMode::None => {
                self.transition(SessionState::Done);
                Ok(())
            }
            ReplyMode::Single => {
                self.transition(SessionState::AwaitingReply);
                let report = self.receive_one().await;
                self.transition(SessionState::Done);
                on_report(report?);
                Ok(())
            }
            ReplyMode::Stream => {
                self.transition(SessionState::Streaming);
                let err = self.stream(&mut on_report).await;
                self.transition(SessionState::Done);
                Err(err)
            }
        }
    }

    async fn begin(&mut self, record: &Record) -> Result<()> {
        self.state = SessionState::Idle;
        let data = self.codec.seal(record, &self.secret)?;

        debug!(
            "sending {} ({} bytes) to {}",
            record,
            data.len(),
            self.destination
        );

        if let Err(e) = self.transport.send_to(&data, self.destination).await {
            self.transition(SessionState::Done);
            return Err(e.into());
        }
        self.transition(SessionState::Sent);
        Ok(())
    }

    /// Loop until a fatal error; recoverable errors only drop the datagram
    async fn stream<F>(&mut self, on_report: &mut F) -> ClientError
    where
        F: FnMut(Report),
    {
        loop {
            match self.receive_one().await {
                Ok(report) => on_report(report),
                Err(e) if e.is_recoverable() => warn!("discarding datagram: {}", e),
                Err(e) => return e,
            }
        }
    }

    async fn receive_one(&self) -> Result<Report> {
        let size = self.frame_size();
        let recv = self.transport.recv_frame(size);

        let (data, source) = match self.recv_timeout {
            Some(limit) => tokio::time::timeout(limit, recv)
                .await
                .map_err(|_| ClientError::Timeout)??,
            None => recv.await?,
        };

        let (record, secret) = self.codec.open(&data)?;
        let authenticated = secret_matches(&secret, &self.secret);

        if !authenticated {
            if !self.insecure {
                return Err(ClientError::Authentication { from: source });
            }
            warn!(
                "accepting record from {} with mismatched secret (insecure mode)",
                source
            );
        }

        debug!("received {} from {}", record, source);

        Ok(Report {
            record,
            secret,
            source,
            authenticated,
        })
    }

    fn transition(&mut self, next: SessionState) {
        debug!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
