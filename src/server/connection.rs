//! Per-connection session handler
//!
//! A [`Connection`] owns the read side of one client's stream and relays every
//! read to the room. The write side belongs to a writer task that drains the
//! client's outbound queue, so all bytes reaching this client go through a
//! single writer and never interleave.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::{ClientId, Registry};
use crate::server::config::ServerConfig;
use crate::session::{DisconnectReason, SessionState};
use crate::stats::{ServerMetrics, SessionStats};

/// One admitted client's session
pub struct Connection<R, W> {
    state: SessionState,
    reader: R,
    writer: W,
    outbound: mpsc::Receiver<Bytes>,
    registry: Arc<Registry>,
    metrics: Arc<ServerMetrics>,
    read_buffer_size: usize,
    drain_timeout: Duration,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a session for a client already admitted to `registry`
    ///
    /// `outbound` must be the receiving side of the queue whose sender was
    /// registered for `id`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ClientId,
        peer_addr: SocketAddr,
        reader: R,
        writer: W,
        outbound: mpsc::Receiver<Bytes>,
        registry: Arc<Registry>,
        metrics: Arc<ServerMetrics>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            state: SessionState::new(id, peer_addr),
            reader,
            writer,
            outbound,
            registry,
            metrics,
            read_buffer_size: config.read_buffer_size.max(1),
            drain_timeout: config.drain_timeout,
        }
    }

    /// Run the session until the stream ends
    ///
    /// Read and write failures end this session only. On the way out the
    /// client is removed from the registry exactly once, queued messages get
    /// `drain_timeout` to flush, and the stream is shut down.
    pub async fn run(self) -> SessionStats {
        let Connection {
            mut state,
            mut reader,
            writer,
            outbound,
            registry,
            metrics,
            read_buffer_size,
            drain_timeout,
        } = self;

        let id = state.id;
        let mut writer_task = spawn_writer(writer, outbound);
        let mut writer_done = false;
        let mut buf = vec![0u8; read_buffer_size];

        state.start_reading();

        let reason = loop {
            let read = tokio::select! {
                result = reader.read(&mut buf) => result,
                joined = &mut writer_task => {
                    writer_done = true;
                    break writer_exit_reason(id, joined);
                }
            };

            match read {
                Ok(0) => break DisconnectReason::PeerClosed,
                Ok(n) => {
                    state.start_relay();
                    let message = Bytes::copy_from_slice(&buf[..n]);
                    let report = registry.broadcast(message, id).await;
                    metrics.message_relayed(n, &report);

                    tracing::trace!(
                        client_id = %id,
                        bytes = n,
                        delivered = report.delivered,
                        failed = report.failed,
                        complete = report.is_complete(),
                        "Relayed message"
                    );

                    state.finish_relay(n, &report);
                }
                Err(e) => {
                    tracing::debug!(client_id = %id, error = %e, "Read failed");
                    break DisconnectReason::ReadError;
                }
            }
        };

        if state.disconnect(reason) {
            registry.remove(id).await;
            metrics.session_closed();
        }
        drop(reader);

        // Dropping the registry entry closed the queue; let the writer flush
        // what is left and shut the stream down.
        if !writer_done {
            match tokio::time::timeout(drain_timeout, &mut writer_task).await {
                Ok(joined) => {
                    writer_exit_reason(id, joined);
                }
                Err(_) => {
                    tracing::debug!(client_id = %id, "Drain timed out");
                    writer_task.abort();
                }
            }
        }

        state.close();
        let stats = state.stats();

        tracing::info!(
            client_id = %id,
            peer = %state.peer_addr,
            reason = %reason,
            messages = stats.messages_relayed,
            bytes = stats.bytes_received,
            duration_ms = stats.duration.as_millis() as u64,
            "Session closed"
        );

        stats
    }
}

/// Drain `outbound` into `writer` until every sender is gone, then shut down
fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Bytes>,
) -> JoinHandle<std::io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            writer.write_all(&message).await?;
            writer.flush().await?;
        }
        writer.shutdown().await
    })
}

fn writer_exit_reason(
    id: ClientId,
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> DisconnectReason {
    match joined {
        Ok(Ok(())) => DisconnectReason::WriterStopped,
        Ok(Err(e)) => {
            tracing::debug!(client_id = %id, error = %e, "Write failed");
            DisconnectReason::WriteError
        }
        Err(e) => {
            tracing::error!(client_id = %id, error = %e, "Writer task failed");
            DisconnectReason::WriteError
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use tokio::io::duplex;
    use tokio_test::io::Builder;

    use super::*;
    use crate::registry::ClientHandle;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    async fn admit(registry: &Arc<Registry>, id: u64) -> (ClientHandle, mpsc::Receiver<Bytes>) {
        let port = 50000u16.wrapping_add(id as u16);
        let (handle, rx) = ClientHandle::channel(ClientId(id), addr(port), 16);
        registry.add(handle.clone()).await.unwrap();
        (handle, rx)
    }

    #[tokio::test]
    async fn test_relays_and_removes_on_eof() {
        let registry = Arc::new(Registry::with_capacity(4));
        let metrics = Arc::new(ServerMetrics::new());
        let config = ServerConfig::default();

        let (peer, mut rx_peer) = admit(&registry, 2).await;
        drop(peer);

        let (client, server) = duplex(256);
        let (reader, writer) = tokio::io::split(server);
        let (handle, outbound) = ClientHandle::channel(ClientId(1), addr(50001), 16);
        registry.add(handle).await.unwrap();
        metrics.session_opened();

        let session = Connection::new(
            ClientId(1),
            addr(50001),
            reader,
            writer,
            outbound,
            Arc::clone(&registry),
            Arc::clone(&metrics),
            &config,
        );
        let task = tokio::spawn(session.run());

        let mut client = client;
        client.write_all(b"hi\n").await.unwrap();
        assert_eq!(rx_peer.recv().await.unwrap(), Bytes::from_static(b"hi\n"));

        client.shutdown().await.unwrap();
        let stats = task.await.unwrap();

        assert_eq!(stats.messages_relayed, 1);
        assert_eq!(stats.bytes_received, 3);
        assert!(!registry.contains(ClientId(1)).await);
        assert!(registry.contains(ClientId(2)).await);
        assert_eq!(metrics.snapshot().active_connections, 0);

        // Server side shut its stream down
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_partial_reads_pass_through() {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(ServerMetrics::new());
        let config = ServerConfig::default();

        let (_peer, mut rx_peer) = admit(&registry, 2).await;
        let (handle, outbound) = ClientHandle::channel(ClientId(1), addr(50001), 16);
        registry.add(handle).await.unwrap();

        let reader = Builder::new().read(b"par").read(b"tial\n").build();
        let writer = Builder::new().build();

        let stats = Connection::new(
            ClientId(1),
            addr(50001),
            reader,
            writer,
            outbound,
            Arc::clone(&registry),
            metrics,
            &config,
        )
        .run()
        .await;

        assert_eq!(rx_peer.recv().await.unwrap(), Bytes::from_static(b"par"));
        assert_eq!(rx_peer.recv().await.unwrap(), Bytes::from_static(b"tial\n"));
        assert_eq!(stats.messages_relayed, 2);
        assert!(!registry.contains(ClientId(1)).await);
    }

    #[tokio::test]
    async fn test_delivers_queued_messages_to_client() {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(ServerMetrics::new());
        let config = ServerConfig::default();

        let (client, server) = duplex(256);
        let (reader, writer) = tokio::io::split(server);
        let (handle, outbound) = admit(&registry, 1).await;
        drop(handle);

        let session = Connection::new(
            ClientId(1),
            addr(50001),
            reader,
            writer,
            outbound,
            Arc::clone(&registry),
            metrics,
            &config,
        );
        let task = tokio::spawn(session.run());

        let report = registry
            .broadcast(Bytes::from_static(b"from elsewhere\n"), ClientId(9))
            .await;
        assert_eq!(report.delivered, 1);

        let mut client = client;
        let mut buf = [0u8; 15];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"from elsewhere\n");

        client.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_write_error_ends_session() {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(ServerMetrics::new());
        let config = ServerConfig::default();

        // Reader stays open; only the writer fails
        let (_client, server) = duplex(256);
        let (reader, _unused) = tokio::io::split(server);
        let writer = Builder::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            ))
            .build();

        let (handle, outbound) = admit(&registry, 1).await;
        drop(handle);

        let session = Connection::new(
            ClientId(1),
            addr(50001),
            reader,
            writer,
            outbound,
            Arc::clone(&registry),
            metrics,
            &config,
        );
        let task = tokio::spawn(session.run());

        registry
            .broadcast(Bytes::from_static(b"boom"), ClientId(9))
            .await;

        let stats = task.await.unwrap();
        assert_eq!(stats.messages_relayed, 0);
        assert!(registry.is_empty().await);
    }

    #[test]
    fn test_writer_exit_reason() {
        assert_eq!(
            writer_exit_reason(ClientId(1), Ok(Ok(()))),
            DisconnectReason::WriterStopped
        );
        assert_eq!(
            writer_exit_reason(
                ClientId(1),
                Ok(Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
            ),
            DisconnectReason::WriteError
        );
    }
}
