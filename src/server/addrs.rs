//! Local address discovery
//!
//! Resolves this machine's hostname so the operator can tell clients where to
//! connect.

use std::net::SocketAddr;

/// IPv4 addresses this host resolves to, paired with `port`
///
/// Failures are logged and produce an empty list; this is only ever used for
/// display.
pub async fn local_addresses(port: u16) -> Vec<SocketAddr> {
    let host = match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read hostname");
            return Vec::new();
        }
    };

    let resolved = match tokio::net::lookup_host((host.as_str(), port)).await {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::warn!(host = %host, error = %e, "Could not resolve local addresses");
            return Vec::new();
        }
    };

    let mut addrs: Vec<SocketAddr> = resolved.filter(SocketAddr::is_ipv4).collect();
    addrs.sort();
    addrs.dedup();
    addrs
}
