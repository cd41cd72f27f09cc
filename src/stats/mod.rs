//! Statistics for chat sessions and the server

pub mod metrics;

pub use metrics::{ServerMetrics, ServerStats, SessionStats};
