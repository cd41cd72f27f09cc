//! Crate-wide error type

use std::net::SocketAddr;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// The listening socket could not be bound
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// The client could not reach the server
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// Any other I/O failure
    Io(std::io::Error),
    /// Registry rejected an operation
    Registry(RegistryError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            Error::Connect { addr, source } => {
                write!(f, "Failed to connect to {}: {}", addr, source)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bind { source, .. } | Error::Connect { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            Error::Registry(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}
