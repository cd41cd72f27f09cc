//! Registry implementation
//!
//! A fixed-size slot table of live clients. All access goes through one
//! `RwLock`; critical sections only touch the table, never a socket.

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::entry::{ClientHandle, ClientId, ClientInfo};
use super::error::RegistryError;

/// Bounded table of connected clients
///
/// Snapshots take the read lock, so concurrent broadcasts don't block each
/// other; admission and removal take the write lock.
pub struct Registry {
    /// One entry per slot; `None` marks a free slot
    slots: RwLock<Vec<Option<ClientHandle>>>,

    /// Configuration
    config: RegistryConfig,
}

impl Registry {
    /// Create a registry with the default capacity
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with a specific number of slots
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(RegistryConfig::default().capacity(capacity))
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            slots: RwLock::new(vec![None; config.capacity]),
            config,
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Admit a client into the first free slot
    ///
    /// Returns the slot index, or [`RegistryError::Full`] if every slot is
    /// taken. The caller is responsible for turning the client away.
    pub async fn add(&self, handle: ClientHandle) -> Result<usize, RegistryError> {
        let mut slots = self.slots.write().await;

        let id = handle.id();
        if slots.iter().flatten().any(|h| h.id() == id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let slot = slots
            .iter()
            .position(Option::is_none)
            .ok_or(RegistryError::Full)?;

        let peer = handle.peer_addr();
        slots[slot] = Some(handle);
        drop(slots);

        tracing::info!(client_id = %id, peer = %peer, slot = slot, "Client registered");

        Ok(slot)
    }

    /// Free the slot held by `id`
    ///
    /// Idempotent: returns the freed slot, or `None` if the client was not
    /// registered.
    pub async fn remove(&self, id: ClientId) -> Option<usize> {
        let mut slots = self.slots.write().await;

        let slot = slots
            .iter()
            .position(|entry| entry.as_ref().map(ClientHandle::id) == Some(id))?;
        // Dropping the handle outside the lock closes the client's queue
        let removed = slots[slot].take();
        drop(slots);
        drop(removed);

        tracing::info!(client_id = %id, slot = slot, "Client unregistered");

        Some(slot)
    }

    /// Handles of every registered client except `excluding`
    ///
    /// The membership read happens under a single lock acquisition, so the
    /// result reflects one point in time.
    pub async fn snapshot(&self, excluding: ClientId) -> Vec<ClientHandle> {
        let slots = self.slots.read().await;

        slots
            .iter()
            .flatten()
            .filter(|h| h.id() != excluding)
            .cloned()
            .collect()
    }

    /// Check if a client is registered
    pub async fn contains(&self, id: ClientId) -> bool {
        let slots = self.slots.read().await;
        slots.iter().flatten().any(|h| h.id() == id)
    }

    /// Number of occupied slots
    pub async fn len(&self) -> usize {
        self.slots.read().await.iter().flatten().count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Check if every slot is taken
    pub async fn is_full(&self) -> bool {
        self.len().await >= self.config.capacity
    }

    /// Describe every registered client, ordered by slot
    pub async fn clients(&self) -> Vec<ClientInfo> {
        let slots = self.slots.read().await;

        slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| {
                entry.as_ref().map(|h| ClientInfo {
                    id: h.id(),
                    peer_addr: h.peer_addr(),
                    slot,
                    connected_for: h.connected_for(),
                })
            })
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;

    // Identity is the ClientId; the port only needs to be valid
    fn handle(id: u64) -> (ClientHandle, mpsc::Receiver<Bytes>) {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);
        ClientHandle::channel(ClientId(id), addr, 8)
    }

    #[tokio::test]
    async fn test_add_until_full() {
        let registry = Registry::with_capacity(3);
        let mut receivers = Vec::new();

        for id in 1..=3 {
            let (h, rx) = handle(id);
            receivers.push(rx);
            assert_eq!(registry.add(h).await, Ok(id as usize - 1));
        }

        assert!(registry.is_full().await);

        // The (N+1)th admit fails until something is removed
        let (h, _rx) = handle(4);
        assert_eq!(registry.add(h).await, Err(RegistryError::Full));
        let (h, _rx) = handle(5);
        assert_eq!(registry.add(h).await, Err(RegistryError::Full));
        assert_eq!(registry.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove_frees_slot() {
        let registry = Registry::with_capacity(2);
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(2);
        registry.add(a).await.unwrap();
        registry.add(b).await.unwrap();

        assert_eq!(registry.remove(ClientId(1)).await, Some(0));
        assert!(!registry.contains(ClientId(1)).await);
        assert!(registry
            .snapshot(ClientId(99))
            .await
            .iter()
            .all(|h| h.id() != ClientId(1)));

        // Freed slot is reused
        let (c, _rx_c) = handle(3);
        assert_eq!(registry.add(c).await, Ok(0));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = Registry::new();
        let (a, _rx) = handle(1);
        registry.add(a).await.unwrap();

        assert_eq!(registry.remove(ClientId(1)).await, Some(0));
        assert_eq!(registry.remove(ClientId(1)).await, None);
        assert_eq!(registry.remove(ClientId(42)).await, None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_closes_outbound_queue() {
        let registry = Registry::new();
        let (a, mut rx) = handle(1);
        registry.add(a).await.unwrap();

        registry.remove(ClientId(1)).await;

        // The lock is free again and the client's writer sees end of queue
        assert!(registry.slots.try_write().is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_large_identities_fill_and_drain() {
        let registry = Registry::with_capacity(2);
        let (a, _rx_a) = handle(64_019);
        let (b, _rx_b) = handle(u64::MAX);
        let (c, _rx_c) = handle(1 << 40);

        assert_eq!(registry.add(a).await, Ok(0));
        assert_eq!(registry.add(b).await, Ok(1));
        assert_eq!(registry.add(c).await, Err(RegistryError::Full));

        assert_eq!(registry.remove(ClientId(u64::MAX)).await, Some(1));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let registry = Registry::new();
        let (a, _rx) = handle(1);
        let (dup, _rx_dup) = handle(1);

        registry.add(a).await.unwrap();
        assert_eq!(
            registry.add(dup).await,
            Err(RegistryError::AlreadyRegistered(ClientId(1)))
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_excludes_sender() {
        let registry = Registry::new();
        let mut receivers = Vec::new();
        for id in 1..=3 {
            let (h, rx) = handle(id);
            receivers.push(rx);
            registry.add(h).await.unwrap();
        }

        let mut ids: Vec<ClientId> = registry
            .snapshot(ClientId(2))
            .await
            .iter()
            .map(ClientHandle::id)
            .collect();
        ids.sort();

        assert_eq!(ids, vec![ClientId(1), ClientId(3)]);
    }

    #[tokio::test]
    async fn test_clients_info() {
        let registry = Registry::with_capacity(4);
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(2);
        registry.add(a).await.unwrap();
        registry.add(b).await.unwrap();
        registry.remove(ClientId(1)).await;

        let clients = registry.clients().await;
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, ClientId(2));
        assert_eq!(clients[0].slot, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_remove_snapshot() {
        let registry = Arc::new(Registry::with_capacity(5));
        let mut tasks = Vec::new();

        for id in 1..=64u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for round in 0..20u64 {
                    let (h, _rx) = handle(id * 1000 + round);
                    let hid = h.id();
                    if registry.add(h).await.is_ok() {
                        let snapshot = registry.snapshot(ClientId(0)).await;
                        assert!(snapshot.len() <= 5);
                        assert!(snapshot.iter().any(|h| h.id() == hid));
                        assert!(registry.remove(hid).await.is_some());
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identities_stay_unique() {
        let registry = Arc::new(Registry::with_capacity(10));
        let mut tasks = Vec::new();

        // Many callers race to register overlapping identities
        for n in 0..40u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (h, rx) = handle(n % 4);
                let result = registry.add(h).await;
                (result, rx)
            }));
        }

        let mut admitted = 0;
        let mut receivers = Vec::new();
        for task in tasks {
            let (result, rx) = task.await.unwrap();
            if result.is_ok() {
                admitted += 1;
            }
            receivers.push(rx);
        }

        assert_eq!(admitted, 4);
        let mut ids: Vec<ClientId> = registry.clients().await.iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
