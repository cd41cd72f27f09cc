//! Client configuration

use std::net::SocketAddr;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server to connect to
    pub server_addr: SocketAddr,

    /// Largest single read from the server
    pub read_buffer_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl ClientConfig {
    /// Create a config for the given server
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            read_buffer_size: 2048,
            tcp_nodelay: true,
        }
    }

    /// Set the read buffer size (at least one byte)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config() {
        let addr: SocketAddr = "192.168.1.50:12345".parse().unwrap();
        let config = ClientConfig::new(addr);

        assert_eq!(config.server_addr, addr);
        assert_eq!(config.read_buffer_size, 2048);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_read_buffer_size_never_zero() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();

        assert_eq!(ClientConfig::new(addr).read_buffer_size(0).read_buffer_size, 1);
    }
}
