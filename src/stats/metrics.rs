//! Statistics and metrics for chat sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::registry::DeliveryReport;

/// Session-level statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total bytes received from the client
    pub bytes_received: u64,
    /// Reads relayed to the room
    pub messages_relayed: u64,
    /// Deliveries that reached another client's queue
    pub deliveries: u64,
    /// Deliveries dropped because a recipient was full or gone
    pub failed_deliveries: u64,
    /// Connection duration
    pub duration: Duration,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one relayed read
    pub fn record_relay(&mut self, bytes: usize, report: &DeliveryReport) {
        self.bytes_received += bytes as u64;
        self.messages_relayed += 1;
        self.deliveries += report.delivered as u64;
        self.failed_deliveries += report.failed as u64;
    }
}

/// Live server-wide counters
///
/// Shared between the acceptor and every session; all updates are relaxed
/// atomic increments.
#[derive(Debug)]
pub struct ServerMetrics {
    started_at: Instant,
    accepted: AtomicU64,
    rejected: AtomicU64,
    active: AtomicU64,
    messages_relayed: AtomicU64,
    bytes_relayed: AtomicU64,
    failed_deliveries: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            active: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            bytes_relayed: AtomicU64::new(0),
            failed_deliveries: AtomicU64::new(0),
        }
    }

    /// A client was admitted
    pub fn session_opened(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// An admitted client left
    pub fn session_closed(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// A client was turned away because the room was full
    pub fn connection_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A read was relayed to the room
    pub fn message_relayed(&self, bytes: usize, report: &DeliveryReport) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.bytes_relayed.fetch_add(bytes as u64, Ordering::Relaxed);
        self.failed_deliveries
            .fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.accepted.load(Ordering::Relaxed),
            rejected_connections: self.rejected.load(Ordering::Relaxed),
            active_connections: self.active.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            bytes_relayed: self.bytes_relayed.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Clients admitted since startup
    pub total_connections: u64,
    /// Clients turned away because the room was full
    pub rejected_connections: u64,
    /// Current active connections
    pub active_connections: u64,
    /// Reads relayed to the room
    pub messages_relayed: u64,
    /// Bytes relayed to the room
    pub bytes_relayed: u64,
    /// Deliveries dropped
    pub failed_deliveries: u64,
    /// Uptime
    pub uptime: Duration,
}
