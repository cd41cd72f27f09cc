//! Interactive chat client
//!
//! A background task copies everything the server sends to the output; the
//! calling task sends input lines to the server. Whichever side ends first
//! ends the session.

use std::net::SocketAddr;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
};
use tokio::net::TcpStream;

use crate::error::{Error, Result};

use super::config::ClientConfig;

/// How a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The server closed the stream
    ServerClosed,
    /// Input reached end of file
    InputClosed,
}

/// Connected chat client
///
/// # Example
/// ```no_run
/// use chat_relay::client::{ChatClient, ClientConfig, ClientExit};
/// use tokio::io::BufReader;
///
/// # async fn example() -> chat_relay::error::Result<()> {
/// let config = ClientConfig::new("127.0.0.1:12345".parse().unwrap());
/// let client = ChatClient::connect(config).await?;
///
/// let input = BufReader::new(tokio::io::stdin());
/// if client.run(input, tokio::io::stdout()).await? == ClientExit::ServerClosed {
///     println!("Disconnected from server.");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    config: ClientConfig,
    stream: TcpStream,
}

impl ChatClient {
    /// Connect to the configured server
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let addr = config.server_addr;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| Error::Connect { addr, source })?;

        if config.tcp_nodelay {
            stream.set_nodelay(true)?;
        }

        tracing::debug!(server = %addr, "Connected");

        Ok(Self { config, stream })
    }

    /// Address of the server
    pub fn server_addr(&self) -> SocketAddr {
        self.config.server_addr
    }

    /// Relay between the server and the given input/output until either side
    /// ends
    pub async fn run<I, O>(self, input: I, output: O) -> Result<ClientExit>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        run_session(self.stream, input, output, self.config.read_buffer_size).await
    }
}

/// Drive one client session over any byte stream
///
/// Server bytes are written to `output` as they arrive, without waiting for a
/// full line. Each line read from `input` is sent as raw bytes with its
/// newline. When `input` ends the write side is shut down. A failed send means
/// the server is gone and ends the session as [`ClientExit::ServerClosed`].
pub async fn run_session<S, I, O>(
    stream: S,
    mut input: I,
    output: O,
    read_buffer_size: usize,
) -> Result<ClientExit>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut receive = tokio::spawn(receive_loop(reader, output, read_buffer_size.max(1)));
    let mut line = Vec::new();

    loop {
        line.clear();

        tokio::select! {
            joined = &mut receive => {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::debug!(error = %e, "Receive failed"),
                    Err(e) => tracing::error!(error = %e, "Receive task failed"),
                }
                return Ok(ClientExit::ServerClosed);
            }
            read = input.read_until(b'\n', &mut line) => {
                if read? == 0 {
                    let _ = writer.shutdown().await;
                    receive.abort();
                    return Ok(ClientExit::InputClosed);
                }
                if let Err(e) = writer.write_all(&line).await {
                    tracing::debug!(error = %e, "Send failed");
                    receive.abort();
                    return Ok(ClientExit::ServerClosed);
                }
            }
        }
    }
}

async fn receive_loop<R, O>(
    mut reader: R,
    mut output: O,
    read_buffer_size: usize,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        output.write_all(&buf[..n]).await?;
        output.flush().await?;
    }
}
