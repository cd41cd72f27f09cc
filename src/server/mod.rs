//! Chat server
//!
//! [`ChatServer`] accepts TCP connections, admits them into the registry up to
//! its capacity, and runs one session per admitted client.

pub mod addrs;
pub mod config;
pub mod connection;
pub mod listener;

pub use addrs::local_addresses;
pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::{ChatServer, ROOM_FULL_NOTICE};
