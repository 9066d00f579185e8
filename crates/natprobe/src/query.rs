//! Convenience entry points that own the socket lifecycle.

use crate::classify::NatClassifier;
use crate::error::StunResult;
use crate::socket::StunSocket;
use crate::types::DiscoveryResult;
use std::io;
use std::net::SocketAddr;
use tokio::net::{UdpSocket, lookup_host};
use tracing::debug;

/// Resolve `host:port` to its first IPv4 socket address
///
/// # Errors
///
/// Returns the lookup error, or `AddrNotAvailable` when the name only
/// resolves to IPv6 addresses.
pub async fn resolve_ipv4(server: &str) -> io::Result<SocketAddr> {
    lookup_host(server)
        .await?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{server} has no IPv4 address"),
            )
        })
}

/// Bind a UDP socket on `local` and classify the NAT towards `server`.
///
/// `server` is a `host:port` string and `local` an `ip:port` to bind, for
/// example `"0.0.0.0:0"`. A wildcard bind IP is replaced by the address of
/// the interface that routes to `server` before the NAT comparison. The
/// socket is released when classification ends.
///
/// # Errors
///
/// I/O errors from resolution or binding, plus the errors of
/// [`NatClassifier::classify`].
pub async fn query(server: &str, local: &str) -> StunResult<DiscoveryResult> {
    query_with(&NatClassifier::new(), server, local).await
}

/// Like [`query`], with a caller-configured classifier
///
/// # Errors
///
/// See [`query`].
pub async fn query_with(
    classifier: &NatClassifier,
    server: &str,
    local: &str,
) -> StunResult<DiscoveryResult> {
    let server = resolve_ipv4(server).await?;
    let socket = UdpSocket::bind(local).await?;
    let local = outbound_local_addr(socket.local_addr()?, server).await?;
    debug!(%server, %local, "bound discovery socket");

    classifier.classify(server, &socket, local).await
}

/// Replace a wildcard bind IP with the interface address used to reach
/// `server`, so it can be compared against the mapped address.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
async fn outbound_local_addr(bound: SocketAddr, server: SocketAddr) -> io::Result<SocketAddr> {
    if !bound.ip().is_unspecified() {
        return Ok(bound);
    }

    let probe = UdpSocket::bind(SocketAddr::new(bound.ip(), 0)).await?;
    probe.connect(server).await?;
    let route = probe.local_addr()?;
    Ok(SocketAddr::new(route.ip(), bound.port()))
}

/// Classify over a socket the caller already owns.
///
/// `local` must be the address `socket` is bound to.
///
/// # Errors
///
/// I/O errors from resolving `server`, plus the errors of
/// [`NatClassifier::classify`].
pub async fn query_with_socket<S: StunSocket + ?Sized>(
    server: &str,
    socket: &S,
    local: SocketAddr,
) -> StunResult<DiscoveryResult> {
    let server = resolve_ipv4(server).await?;
    NatClassifier::new().classify(server, socket, local).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StunError;
    use crate::types::NatType;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolve_ipv4_literal() {
        let addr = resolve_ipv4("127.0.0.1:3478").await.unwrap();
        assert_eq!(addr, "127.0.0.1:3478".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_ipv6_only_is_rejected() {
        let err = resolve_ipv4("[::1]:3478").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrNotAvailable);
    }

    #[tokio::test]
    async fn test_outbound_local_addr_keeps_specific_bind() {
        let bound: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let local = outbound_local_addr(bound, "127.0.0.1:3478".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(local, bound);
    }

    #[tokio::test]
    async fn test_outbound_local_addr_resolves_wildcard() {
        let bound: SocketAddr = "0.0.0.0:40000".parse().unwrap();
        let local = outbound_local_addr(bound, "127.0.0.1:3478".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(local, "127.0.0.1:40000".parse().unwrap());
    }

    #[tokio::test]
    async fn test_query_rejects_bad_server() {
        let result = query("not a host", "127.0.0.1:0").await;
        assert!(matches!(result, Err(StunError::Io(_))));
    }

    #[tokio::test]
    async fn test_query_with_silent_server_reports_blocked() {
        // Bound but never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = silent.local_addr().unwrap().to_string();

        let classifier = NatClassifier::with_config(crate::classify::ProbeConfig {
            initial_timeout: Duration::from_millis(10),
            transaction_timeout: Duration::from_millis(10),
            max_attempts: 1,
        });
        let result = query_with(&classifier, &server, "127.0.0.1:0").await.unwrap();

        assert_eq!(result.nat_type(), NatType::UdpBlocked);
        assert_eq!(result.public_ip(), None);
    }
}
