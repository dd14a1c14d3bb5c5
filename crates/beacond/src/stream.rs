//! Stream listener — accepts TCP connections carrying one text message or
//! one file transfer each.
//!
//! Each accepted connection runs in its own task so a slow or stalled
//! peer cannot starve other inbound stream traffic; a semaphore caps how
//! many run at once. Framing never assumes one read returns a complete
//! logical message: classification and header parsing work over an
//! accumulating buffer, and file payloads are copied until the declared
//! size is reached or the peer closes early (accepted as truncation).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use beacon_core::frame::{self, FileHeader};
use beacon_services::{InboundMessage, InboundTx};

/// Cap on concurrently serviced stream connections.
pub const MAX_CONNECTIONS: usize = 32;

const READ_BUF: usize = 8 * 1024;

pub struct StreamListener {
    listener: TcpListener,
    queue: InboundTx,
    storage_dir: PathBuf,
    permits: Arc<Semaphore>,
}

impl StreamListener {
    pub fn new(listener: TcpListener, queue: InboundTx, storage_dir: PathBuf) -> Self {
        Self {
            listener,
            queue,
            storage_dir,
            permits: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
        }
    }

    /// Accept connections forever — cancel by dropping the task handle.
    pub async fn run(self) -> Result<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "stream listener starting");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let permit = match self.permits.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => return Ok(()), // semaphore closed, listener shutting down
            };
            let queue = self.queue.clone();
            let storage_dir = self.storage_dir.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, queue, storage_dir).await {
                    tracing::warn!(peer = %peer_addr, error = %e, "stream connection failed");
                }
                drop(permit);
            });
        }
    }
}

/// Service one connection: classify the payload, then receive it fully.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    queue: InboundTx,
    storage_dir: PathBuf,
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    let mut scratch = vec![0u8; READ_BUF];

    // Accumulate until the payload classifies as file or text. A single
    // read may return partial data, including a torn FILE: marker.
    let header = loop {
        if frame::is_file_tagged(&buf) {
            if let Some((header, consumed)) = frame::parse_file_header(&buf)? {
                buf.drain(..consumed);
                break Some(header);
            }
        } else if !frame::may_become_file_tagged(&buf) {
            break None;
        }

        let n = stream.read(&mut scratch).await.context("read failed")?;
        if n == 0 {
            if frame::is_file_tagged(&buf) {
                // File-tagged but the header never completed.
                tracing::warn!(peer = %peer_addr, "dropping unterminated file header");
                return Ok(());
            }
            // EOF before classification resolved — whatever arrived is text.
            break None;
        }
        buf.extend_from_slice(&scratch[..n]);
    };

    match header {
        Some(header) => receive_file(&mut stream, peer_addr, header, &buf, &storage_dir).await,
        None => receive_text(&mut stream, peer_addr, buf, &queue).await,
    }
}

/// Materialize a stream file transfer to the storage directory.
///
/// `initial` holds payload bytes already read past the header. Reading
/// fewer than the declared `filesize` (peer disconnected early) is a
/// recoverable truncation, not an error.
async fn receive_file(
    stream: &mut TcpStream,
    peer_addr: SocketAddr,
    header: FileHeader,
    initial: &[u8],
    storage_dir: &Path,
) -> Result<()> {
    // Filename comes verbatim from the peer header (see DESIGN.md).
    let path = storage_dir.join(&header.filename);
    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;

    let first = initial.len().min(header.filesize as usize);
    file.write_all(&initial[..first])
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    let mut written = first as u64;

    let mut scratch = vec![0u8; READ_BUF];
    while written < header.filesize {
        let want = ((header.filesize - written) as usize).min(scratch.len());
        let n = stream.read(&mut scratch[..want]).await.context("read failed")?;
        if n == 0 {
            tracing::warn!(
                peer = %peer_addr,
                filename = %header.filename,
                written,
                declared = header.filesize,
                "file truncated — peer closed early"
            );
            break;
        }
        file.write_all(&scratch[..n])
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        written += n as u64;
    }
    file.flush().await.ok();

    tracing::info!(
        from = %header.username,
        filename = %header.filename,
        bytes = written,
        "file received"
    );
    Ok(())
}

/// Receive one EOF-delimited text message and enqueue it.
async fn receive_text(
    stream: &mut TcpStream,
    peer_addr: SocketAddr,
    mut buf: Vec<u8>,
    queue: &InboundTx,
) -> Result<()> {
    let mut scratch = vec![0u8; READ_BUF];
    loop {
        if buf.len() > frame::MAX_TEXT_BYTES {
            anyhow::bail!("text message exceeds {} bytes", frame::MAX_TEXT_BYTES);
        }
        let n = stream.read(&mut scratch).await.context("read failed")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&scratch[..n]);
    }

    if buf.is_empty() {
        return Ok(());
    }

    match String::from_utf8(buf) {
        Ok(text) => {
            let _ = queue.send(InboundMessage::Text(format!("TCP from {peer_addr}: {text}")));
        }
        Err(_) => {
            tracing::warn!(peer = %peer_addr, "dropping malformed UTF-8 text payload");
        }
    }
    Ok(())
}
