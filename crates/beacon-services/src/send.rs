//! Outbound senders — one fresh socket or connection per call, closed when
//! the single operation completes. Invoked synchronously from the menu;
//! none of these go through the inbound queue.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use beacon_core::frame::{self, FileHeader};

use crate::registry::PeerRecord;

/// Send one text message over the stream transport.
pub async fn send_text_stream(addr: SocketAddr, username: &str, message: &str) -> Result<()> {
    let payload = frame::render_text(username, message);
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    stream
        .write_all(payload.as_bytes())
        .await
        .with_context(|| format!("failed to send to {addr}"))?;
    stream.shutdown().await.ok();
    Ok(())
}

/// Send one text message as a single datagram.
pub async fn send_text_datagram(addr: SocketAddr, username: &str, message: &str) -> Result<()> {
    let payload = frame::render_text(username, message);
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind datagram socket")?;
    socket
        .send_to(payload.as_bytes(), addr)
        .await
        .with_context(|| format!("failed to send to {addr}"))?;
    Ok(())
}

/// Send the same text datagram to every known peer, sequentially, over one
/// shared socket. A per-peer failure is logged and counted but never
/// aborts the remaining peers. Returns the failure count.
pub async fn broadcast_text(
    peers: &[PeerRecord],
    port: u16,
    username: &str,
    message: &str,
) -> Result<usize> {
    let payload = frame::render_text(username, message);
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind broadcast socket")?;

    let mut failures = 0;
    for peer in peers {
        let addr = SocketAddr::new(peer.addr, port);
        if let Err(e) = socket.send_to(payload.as_bytes(), addr).await {
            tracing::warn!(peer = %addr, error = %e, "broadcast send failed");
            failures += 1;
        }
    }
    Ok(failures)
}

/// Send a whole file over the stream transport: one-shot header followed
/// by the file bytes, all on one connection.
pub async fn send_file_stream(addr: SocketAddr, path: &Path, username: &str) -> Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let filename = file_name(path);

    let mut payload = frame::encode_file_header(&FileHeader {
        username: username.to_string(),
        filename,
        filesize: data.len() as u64,
    });
    payload.extend_from_slice(&data);

    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    stream
        .write_all(&payload)
        .await
        .with_context(|| format!("failed to send file to {addr}"))?;
    stream.shutdown().await.ok();
    Ok(())
}

/// Send a file as independent chunk datagrams, each tagged with an
/// incrementing index. No ack, no retransmission, no flow control.
/// Returns the number of chunks sent.
pub async fn send_file_datagram(addr: SocketAddr, path: &Path, username: &str) -> Result<u64> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let filename = file_name(path);

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind datagram socket")?;

    let mut index: u64 = 0;
    for chunk in data.chunks(frame::CHUNK_PAYLOAD_MAX) {
        let datagram = frame::encode_chunk_frame(username, &filename, index, chunk)?;
        socket
            .send_to(&datagram, addr)
            .await
            .with_context(|| format!("failed to send chunk {index} to {addr}"))?;
        index += 1;
    }
    Ok(index)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}
