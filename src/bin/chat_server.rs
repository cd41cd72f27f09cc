//! Chat server
//!
//! Run with: chat-server <PORT> [--max-clients N]
//!
//! Up to `--max-clients` people (default 10) can connect; anything one of them
//! sends is relayed to everyone else. The server prints this machine's
//! addresses so people know where to connect.
//!
//! Logging is controlled with `RUST_LOG` (default `chat_relay=info`).

use clap::Parser;

use chat_relay::registry::config::DEFAULT_CAPACITY;
use chat_relay::server::local_addresses;
use chat_relay::{ChatServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "chat-server", about = "Relay chat messages between TCP clients")]
struct Args {
    /// Port to listen on (all interfaces)
    port: u16,

    /// Maximum number of clients in the room at once
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_relay=info")),
        )
        .init();

    let config = ServerConfig::with_port(args.port).max_clients(args.max_clients);
    let server = ChatServer::new(config);
    let listener = server.bind().await?;

    println!("=====================================");
    println!("  Chat server is up and running.");
    println!("  Port: {}", args.port);
    let addrs = local_addresses(args.port).await;
    if addrs.is_empty() {
        println!("Couldn't figure out local IP addresses.");
    } else {
        println!();
        println!("Tell your friends to use one of these IPs with port {}:", args.port);
        for addr in &addrs {
            println!("  {}", addr);
        }
        println!();
    }
    println!("=====================================");

    server
        .serve_until(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let stats = server.stats();
    tracing::info!(
        connections = stats.total_connections,
        rejected = stats.rejected_connections,
        messages = stats.messages_relayed,
        uptime_secs = stats.uptime.as_secs(),
        "Server stopped"
    );

    Ok(())
}
