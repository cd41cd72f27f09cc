//! Chat client
//!
//! Connects to a chat server, prints everything the server relays and sends
//! each input line to the room.

pub mod chat;
pub mod config;

pub use chat::{run_session, ChatClient, ClientExit};
pub use config::ClientConfig;
