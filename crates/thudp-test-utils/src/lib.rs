//! Common test helpers and utilities for ThUDP tests
//!
//! - Port allocation
//! - Shared key material
//! - Condition-based waiting (no hardcoded sleeps)
//! - A zone device running on loopback, stopped on drop
//! - Record collectors for subscription testing

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thudp_core::{BlockCodec, Record};
use thudp_device::{DeviceConfig, DeviceEvent, Responder, ZoneTable};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Key used by test peers
pub const TEST_KEY: &[u8; 32] = b"12345678901234567890123456789012";

/// IV used by test peers
pub const TEST_IV: &[u8; 16] = b"1234567890123456";

/// Secret used by test peers
pub const TEST_SECRET: &[u8] = b"test-secret";

/// Block codec built from [`TEST_KEY`] and [`TEST_IV`]
pub fn test_codec() -> BlockCodec {
    BlockCodec::new(TEST_KEY, TEST_IV).unwrap()
}

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    false
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || counter.load(Ordering::SeqCst) >= target,
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

// ============================================================================
// Test Device
// ============================================================================

/// Zone device on 127.0.0.1 replying to the requester's source port
pub struct TestDevice {
    addr: SocketAddr,
    zones: Arc<ZoneTable>,
    events: mpsc::Receiver<DeviceEvent>,
    handle: JoinHandle<()>,
}

impl TestDevice {
    /// Start a device with the shared test key material
    pub async fn start() -> Self {
        Self::start_with_config(DeviceConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            reply_port: None,
            ..Default::default()
        })
        .await
    }

    /// Start a device with a custom configuration
    pub async fn start_with_config(config: DeviceConfig) -> Self {
        let (responder, events) = Responder::bind(config, test_codec(), TEST_SECRET)
            .await
            .expect("device bind failed");
        let addr = responder.local_addr().unwrap();
        let zones = responder.zones();

        let handle = tokio::spawn(async move {
            let _ = responder.run().await;
        });

        Self {
            addr,
            zones,
            events,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn zones(&self) -> &ZoneTable {
        &self.zones
    }

    /// Next device event, or `None` after `max_wait`
    pub async fn next_event(&mut self, max_wait: Duration) -> Option<DeviceEvent> {
        tokio::time::timeout(max_wait, self.events.recv())
            .await
            .ok()
            .flatten()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for TestDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Test Collectors
// ============================================================================

/// Collector for received records with thread-safe access
#[derive(Clone, Default)]
pub struct RecordCollector {
    records: Arc<Mutex<Vec<Record>>>,
    count: Arc<AtomicU32>,
}

impl RecordCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record
    pub fn push(&self, record: Record) {
        self.records.lock().push(record);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Get the count of received records
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait for at least n records to be received
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }

    /// Get all collected records
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Check if a record for a zone was received
    pub fn has_zone(&self, zone: &str) -> bool {
        self.records.lock().iter().any(|r| r.zone == zone)
    }
}
