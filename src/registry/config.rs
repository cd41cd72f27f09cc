//! Registry configuration

/// Default number of concurrent clients
pub const DEFAULT_CAPACITY: usize = 10;

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Number of slots; the room is full once every slot is taken
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl RegistryConfig {
    /// Set the slot count
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
