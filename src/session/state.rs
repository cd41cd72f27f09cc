//! Session state machine
//!
//! Tracks a chat session from admission to close:
//! `Connected → Reading → {Relaying → Reading}* → Disconnecting → Closed`.

use std::net::SocketAddr;
use std::time::Instant;

use crate::registry::{ClientId, DeliveryReport};
use crate::stats::SessionStats;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Admitted to the registry, nothing read yet
    Connected,
    /// Waiting for inbound bytes
    Reading,
    /// Handing received bytes to the broadcaster
    Relaying,
    /// Leaving the registry and releasing the stream
    Disconnecting,
    /// Terminal
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer closed the stream (zero-length read)
    PeerClosed,
    /// Reading from the peer failed
    ReadError,
    /// Writing to the peer failed
    WriteError,
    /// Outbound queue was closed from the registry side
    WriterStopped,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisconnectReason::PeerClosed => "peer closed",
            DisconnectReason::ReadError => "read error",
            DisconnectReason::WriteError => "write error",
            DisconnectReason::WriterStopped => "writer stopped",
        };
        f.write_str(s)
    }
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Client identity
    pub id: ClientId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Why the session is ending, once known
    pub disconnect_reason: Option<DisconnectReason>,

    stats: SessionStats,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: ClientId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            disconnect_reason: None,
            stats: SessionStats::new(),
        }
    }

    /// Wait for the next read
    pub fn start_reading(&mut self) {
        if matches!(self.phase, SessionPhase::Connected | SessionPhase::Relaying) {
            self.phase = SessionPhase::Reading;
        }
    }

    /// Bytes arrived
    pub fn start_relay(&mut self) {
        if self.phase == SessionPhase::Reading {
            self.phase = SessionPhase::Relaying;
        }
    }

    /// Relay finished; back to reading whatever the delivery outcome
    pub fn finish_relay(&mut self, bytes: usize, report: &DeliveryReport) {
        if self.phase == SessionPhase::Relaying {
            self.stats.record_relay(bytes, report);
            self.start_reading();
        }
    }

    /// Begin disconnecting
    ///
    /// Returns `true` only on the first call, so cleanup runs exactly once.
    pub fn disconnect(&mut self, reason: DisconnectReason) -> bool {
        match self.phase {
            SessionPhase::Disconnecting | SessionPhase::Closed => false,
            _ => {
                self.phase = SessionPhase::Disconnecting;
                self.disconnect_reason = Some(reason);
                true
            }
        }
    }

    /// Finish closing
    pub fn close(&mut self) {
        if self.phase == SessionPhase::Disconnecting {
            self.phase = SessionPhase::Closed;
        }
    }

    /// Check if the session is terminal
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Session statistics with the current duration filled in
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            duration: self.duration(),
            ..self.stats.clone()
        }
    }
}
