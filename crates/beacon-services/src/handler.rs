//! Message/file handler — the single consumer of the inbound queue.
//!
//! Text items are printed. File chunks are parsed and their payloads
//! appended to the destination file in arrival order. There is no
//! index-based reordering and no completeness check: over an unordered
//! transport the destination bytes equal arrival order, which may differ
//! from send order. That matches the wire behavior this protocol ships
//! with and is kept for compatibility. Concurrent transfers that share a
//! filename interleave into the same file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;

use beacon_core::frame;

use crate::inbound::{InboundMessage, InboundRx};

pub struct MessageHandler {
    storage_dir: PathBuf,
}

impl MessageHandler {
    /// Create a handler writing received files under `storage_dir`.
    /// The directory is created if absent.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)
            .with_context(|| format!("failed to create {}", storage_dir.display()))?;
        Ok(Self { storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Drain the queue until every sender is gone.
    pub async fn run(self, mut rx: InboundRx) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg);
        }
        tracing::info!("inbound queue closed, handler exiting");
    }

    /// Process one queued item. Per-item failures are logged and dropped —
    /// nothing here may kill the consumer.
    pub fn handle(&self, msg: InboundMessage) {
        match msg {
            InboundMessage::Text(text) => {
                println!("\n{text}\n");
            }
            InboundMessage::FileChunk(frame) => {
                if let Err(e) = self.append_chunk(&frame) {
                    tracing::warn!(error = %e, "file chunk dropped");
                }
            }
        }
    }

    fn append_chunk(&self, frame_bytes: &Bytes) -> Result<()> {
        let (header, payload) =
            frame::parse_chunk_frame(frame_bytes).context("malformed chunk header")?;

        if payload.len() != header.length {
            tracing::debug!(
                declared = header.length,
                received = payload.len(),
                filename = %header.filename,
                "chunk length field disagrees with payload"
            );
        }

        // Filename comes verbatim from the peer — the storage directory is
        // the only containment (known path-traversal gap, see DESIGN.md).
        let path = self.storage_dir.join(&header.filename);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(payload)
            .with_context(|| format!("failed to append to {}", path.display()))?;

        tracing::info!(
            from = %header.username,
            filename = %header.filename,
            index = header.index,
            bytes = payload.len(),
            "file chunk received"
        );
        Ok(())
    }
}
