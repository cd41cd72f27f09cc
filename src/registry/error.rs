//! Registry error types

use super::entry::ClientId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Every slot is taken
    Full,
    /// A client with this identity is already registered
    AlreadyRegistered(ClientId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Full => write!(f, "Chat room is full"),
            RegistryError::AlreadyRegistered(id) => {
                write!(f, "Client already registered: {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
