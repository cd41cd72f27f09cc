//! Chat client
//!
//! Run with: chat-client <SERVER_IP> <PORT>
//!
//! Type messages and press Enter to send; everything other people type shows
//! up here. When the server goes away the whole process exits.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tokio::io::BufReader;

use chat_relay::{ChatClient, ClientConfig, ClientExit};

#[derive(Debug, Parser)]
#[command(name = "chat-client", about = "Join a chat-relay room")]
struct Args {
    /// Server IP address, e.g. 192.168.1.50
    server_ip: IpAddr,

    /// Server port
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chat_relay=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr = SocketAddr::new(args.server_ip, args.port);
    let client = ChatClient::connect(ClientConfig::new(addr)).await?;

    println!("Connected to chat server at {}", client.server_addr());

    let input = BufReader::new(tokio::io::stdin());
    match client.run(input, tokio::io::stdout()).await? {
        ClientExit::ServerClosed => {
            println!("Disconnected from server.");
            // Stdin may still be blocked in a read; leave without waiting for it
            std::process::exit(0);
        }
        ClientExit::InputClosed => Ok(()),
    }
}
