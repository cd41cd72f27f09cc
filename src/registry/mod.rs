//! Connection registry and broadcast fan-out
//!
//! The registry holds a fixed number of slots, one per live client. Each slot
//! stores a [`ClientHandle`]: the client's identity plus the sending side of
//! its outbound queue. Broadcasting never touches a socket directly; it
//! enqueues onto each recipient's queue, and that recipient's writer task is
//! the only thing that ever writes to its stream.
//!
//! # Architecture
//!
//! ```text
//!                           Arc<Registry>
//!                     ┌─────────────────────────┐
//!                     │ slots: [Option<         │
//!                     │   ClientHandle {        │
//!                     │     id, peer_addr,      │
//!                     │     tx: mpsc::Sender,   │
//!                     │   }                     │
//!                     │ >; capacity]            │
//!                     └───────────┬─────────────┘
//!                                 │ snapshot(excluding sender)
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Session A]             [Writer B]              [Writer C]
//!    read() ──► broadcast()──► rx.recv() ──► TCP    rx.recv() ──► TCP
//! ```
//!
//! # Zero-Copy Design
//!
//! Messages are `bytes::Bytes`, so every recipient queue holds a
//! reference-counted view of the same allocation.

pub mod config;
pub mod entry;
pub mod error;
pub mod fanout;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ClientHandle, ClientId, ClientInfo, DeliveryError};
pub use error::RegistryError;
pub use fanout::DeliveryReport;
pub use store::Registry;
