//! Chat server listener
//!
//! Handles the TCP accept loop, admission control and session spawning.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::registry::{ClientHandle, ClientId, Registry, RegistryError};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::{ServerMetrics, ServerStats};

/// Sent to a client turned away because every slot is taken
pub const ROOM_FULL_NOTICE: &str = "Chat room is full. Try again later.\n";

/// Chat server
pub struct ChatServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    metrics: Arc<ServerMetrics>,
    next_client_id: AtomicU64,
}

impl ChatServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Registry::with_config(config.registry_config());

        Self {
            config,
            registry: Arc::new(registry),
            metrics: Arc::new(ServerMetrics::new()),
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Current server statistics
    pub fn stats(&self) -> ServerStats {
        self.metrics.snapshot()
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        tracing::info!(
            addr = %listener.local_addr().unwrap_or(addr),
            max_clients = self.registry.capacity(),
            "Chat server listening"
        );

        Ok(listener)
    }

    /// Run the server
    ///
    /// This method only returns if binding fails.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Run the server until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve_until(listener, shutdown).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.accept_loop(&listener).await
    }

    /// Accept connections on an already bound listener until `shutdown`
    /// completes
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let id = ClientId(self.next_client_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(client_id = %id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(client_id = %id, error = %e, "Failed to configure socket");
            return;
        }

        let (handle, outbound) =
            ClientHandle::channel(id, peer_addr, self.config.outbound_queue_capacity);

        match self.registry.add(handle).await {
            Ok(_) => {}
            Err(RegistryError::Full) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: room is full");
                self.metrics.connection_rejected();
                tokio::spawn(reject(socket, peer_addr));
                return;
            }
            Err(e) => {
                tracing::error!(client_id = %id, error = %e, "Failed to register client");
                return;
            }
        }

        self.metrics.session_opened();

        let (reader, writer) = socket.into_split();
        let connection = Connection::new(
            id,
            peer_addr,
            reader,
            writer,
            outbound,
            Arc::clone(&self.registry),
            Arc::clone(&self.metrics),
            &self.config,
        );

        tokio::spawn(async move {
            connection.run().await;
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }

        Ok(())
    }
}

/// Tell a client the room is full, then close its stream
async fn reject(mut socket: TcpStream, peer_addr: SocketAddr) {
    if let Err(e) = socket.write_all(ROOM_FULL_NOTICE.as_bytes()).await {
        tracing::debug!(peer = %peer_addr, error = %e, "Failed to send room-full notice");
        return;
    }
    let _ = socket.shutdown().await;
}
