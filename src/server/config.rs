//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::registry::config::DEFAULT_CAPACITY;
use crate::registry::RegistryConfig;

/// Port used when none is given
pub const DEFAULT_PORT: u16 = 12345;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent clients; further connections are turned away
    pub max_clients: usize,

    /// Largest single read from a client
    pub read_buffer_size: usize,

    /// Messages queued per client before new ones are dropped for it
    pub outbound_queue_capacity: usize,

    /// How long a closing session waits for its queued messages to flush
    pub drain_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_clients: DEFAULT_CAPACITY,
            read_buffer_size: 2048,
            outbound_queue_capacity: 256,
            drain_timeout: Duration::from_secs(5),
            tcp_nodelay: true, // Chat lines are small
        }
    }
}

impl ServerConfig {
    /// Listen on every local interface at `port`
    pub fn with_port(port: u16) -> Self {
        Self::with_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum concurrent clients
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the read buffer size (at least one byte)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the per-client outbound queue length (at least one message)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set the drain timeout
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Registry settings derived from this config
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default().capacity(self.max_clients)
    }
}
