//! Per-connection session state

pub mod state;

pub use state::{DisconnectReason, SessionPhase, SessionState};
