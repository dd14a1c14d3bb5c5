//! Discovery heartbeats — broadcaster and listener.
//!
//! The broadcaster announces `HEARTBEAT:<username>` to the limited
//! broadcast address on a fixed interval. The listener records every
//! heartbeat it receives and re-checks all stored timestamps on each
//! receipt, so eviction is driven by traffic rather than a timer.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time;

use beacon_core::frame;
use beacon_services::SharedRegistry;

/// Broadcast this node's heartbeat on a regular interval.
///
/// Runs forever — cancel by dropping the task handle. Loss is tolerated;
/// the next tick resends.
pub async fn broadcast_loop(dest: SocketAddr, username: String, interval_secs: u64) -> Result<()> {
    let socket = make_broadcast_socket().context("failed to create broadcast socket")?;
    let payload = frame::encode_heartbeat(&username);

    let mut interval = time::interval(Duration::from_secs(interval_secs));

    tracing::info!(%dest, interval_secs, "heartbeat broadcast starting");

    loop {
        interval.tick().await;

        match socket.send_to(&payload, &dest.into()) {
            Ok(n) => tracing::trace!(bytes = n, "heartbeat sent"),
            Err(e) => tracing::warn!(error = %e, "heartbeat send failed"),
        }
    }
}

/// Create a UDP socket allowed to send to the broadcast address.
fn make_broadcast_socket() -> Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;
    socket.set_broadcast(true).context("SO_BROADCAST")?;
    Ok(socket)
}

/// Bind the discovery listener socket on a known port.
pub fn bind_discovery_socket(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;
    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_broadcast(true).context("SO_BROADCAST")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&bind_addr.into()).context("bind()")?;

    UdpSocket::from_std(socket.into()).context("failed to convert to tokio UdpSocket")
}

/// Listen for heartbeats and keep the membership registry current.
///
/// Runs forever — cancel by dropping the task handle. Every received
/// datagram, heartbeat or not, triggers an eviction pass; a dead peer is
/// therefore pruned only once some later datagram arrives after the
/// timeout elapses.
pub async fn listener_loop(
    socket: UdpSocket,
    registry: SharedRegistry,
    peer_timeout: Duration,
) -> Result<()> {
    let mut buf = vec![0u8; frame::UDP_PACKET_SIZE];

    tracing::info!(addr = %socket.local_addr()?, "discovery listener starting");

    loop {
        let (len, peer_addr) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "recv_from failed");
                continue;
            }
        };
        let now = Instant::now();

        match frame::parse_heartbeat(&buf[..len]) {
            Ok(username) => registry.record_heartbeat(peer_addr.ip(), username, now),
            Err(e) => {
                tracing::trace!(from = %peer_addr, error = %e, "ignoring non-heartbeat datagram");
            }
        }

        registry.evict_stale(now, peer_timeout);
    }
}
