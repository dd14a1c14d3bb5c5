//! Beacon integration test harness.
//!
//! Tests drive the real listener tasks over loopback sockets with
//! ephemeral ports, so no privileged setup is required. Peers that need
//! distinct addresses use further 127.0.0.0/8 loopback addresses, which
//! Linux routes without configuration.
//!
//! Each test owns the tasks it spawns; temp directories are tagged per
//! test so runs do not interfere.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::net::{TcpListener, UdpSocket};

use beacon_services::{inbound_channel, InboundMessage, InboundRx, MessageHandler};
use beacond::{datagram::DatagramListener, stream::StreamListener};

mod files;
mod messaging;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Fresh per-test directory under the system temp dir.
pub fn test_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("beacon-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("failed to create test dir");
    dir
}

/// Spawn a stream listener on an ephemeral loopback port.
/// Returns its address, storage directory, and the inbound queue tail.
pub async fn spawn_stream_listener(tag: &str) -> Result<(SocketAddr, PathBuf, InboundRx)> {
    let storage_dir = test_dir(tag);
    let (tx, rx) = inbound_channel();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test TCP listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(StreamListener::new(listener, tx, storage_dir.clone()).run());

    Ok((addr, storage_dir, rx))
}

/// Spawn a datagram listener on an ephemeral loopback port.
pub async fn spawn_datagram_listener() -> Result<(SocketAddr, InboundRx)> {
    let (tx, rx) = inbound_channel();

    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .context("failed to bind test UDP socket")?;
    let addr = socket.local_addr()?;
    tokio::spawn(DatagramListener::new(socket, tx).run());

    Ok((addr, rx))
}

/// Spawn a datagram listener whose queue drains into a file handler.
/// Returns the listener address and the handler's storage directory.
pub async fn spawn_datagram_node(tag: &str) -> Result<(SocketAddr, PathBuf)> {
    let (addr, rx) = spawn_datagram_listener().await?;
    let handler = MessageHandler::new(test_dir(tag))?;
    let storage_dir = handler.storage_dir().to_path_buf();
    tokio::spawn(handler.run(rx));
    Ok((addr, storage_dir))
}

/// Receive the next inbound item, failing the test after a timeout.
pub async fn recv_inbound(rx: &mut InboundRx) -> Result<InboundMessage> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .context("timed out waiting for an inbound message")?
        .context("inbound queue closed")
}

/// Poll until `ready` returns true or the deadline passes.
pub async fn wait_until(what: &str, deadline: Duration, ready: impl Fn() -> bool) -> Result<()> {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if ready() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    bail!("timed out waiting for {what}")
}

/// Poll until the file at `path` exists with exactly `expected` bytes,
/// then return its contents.
pub async fn wait_for_file(path: &std::path::Path, expected: u64) -> Result<Vec<u8>> {
    wait_until(
        &format!("{} to reach {expected} bytes", path.display()),
        Duration::from_secs(10),
        || std::fs::metadata(path).map(|m| m.len() == expected).unwrap_or(false),
    )
    .await?;
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// A patterned test payload — byte i is a function of i, so any
/// truncation, reorder, or corruption shows up in comparison.
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
