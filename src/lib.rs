//! Multi-user TCP chat relay
//!
//! Every chunk of bytes a client sends is relayed verbatim to every other
//! connected client. The server keeps a bounded registry of live connections;
//! clients beyond the capacity are told the room is full and disconnected.
//!
//! # Example
//! ```no_run
//! use chat_relay::{ChatServer, ServerConfig};
//!
//! # async fn example() -> chat_relay::error::Result<()> {
//! let server = ChatServer::new(ServerConfig::with_port(12345).max_clients(10));
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{ChatClient, ClientConfig, ClientExit};
pub use error::{Error, Result};
pub use registry::{ClientHandle, ClientId, Registry, RegistryConfig, RegistryError};
pub use server::{ChatServer, ServerConfig, ROOM_FULL_NOTICE};
