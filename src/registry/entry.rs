//! Client identity and handle types
//!
//! A [`ClientHandle`] is what the registry stores per slot. It never owns the
//! socket: it only carries the sending side of the client's outbound queue.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Unique identifier of a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a single delivery failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// Recipient's outbound queue is full (slow reader)
    QueueFull,
    /// Recipient's writer has stopped
    Closed,
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::QueueFull => write!(f, "outbound queue full"),
            DeliveryError::Closed => write!(f, "outbound queue closed"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Registry entry for a single client
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    tx: mpsc::Sender<Bytes>,
}

impl ClientHandle {
    /// Create a handle around an outbound queue sender
    pub fn new(id: ClientId, peer_addr: SocketAddr, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            tx,
        }
    }

    /// Create a handle together with its outbound queue
    pub fn channel(
        id: ClientId,
        peer_addr: SocketAddr,
        queue_capacity: usize,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        (Self::new(id, peer_addr, tx), rx)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Time since the client was accepted
    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Enqueue a message without waiting
    ///
    /// Never blocks: a slow recipient gets `QueueFull` instead of stalling the
    /// sender's session.
    pub fn deliver(&self, message: Bytes) -> Result<(), DeliveryError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Read-only view of a registered client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: ClientId,
    pub peer_addr: SocketAddr,
    pub slot: usize,
    pub connected_for: Duration,
}
