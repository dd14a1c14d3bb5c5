//! Inbound dispatch queue — decouples the transport listeners from the
//! single message consumer.
//!
//! Unbounded so producers never block on insertion. Order is FIFO per
//! producer; arrival interleaving across the two listeners is whatever the
//! channel observed.

use bytes::Bytes;
use tokio::sync::mpsc;

/// One classified inbound item, produced by a listener and consumed
/// exactly once by the handler.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// A rendered text message, ready to print.
    Text(String),
    /// A raw datagram chunk frame. The fixed header is still embedded —
    /// parsing is deferred to the handler.
    FileChunk(Bytes),
}

pub type InboundTx = mpsc::UnboundedSender<InboundMessage>;
pub type InboundRx = mpsc::UnboundedReceiver<InboundMessage>;

/// Create the inbound dispatch queue.
pub fn inbound_channel() -> (InboundTx, InboundRx) {
    mpsc::unbounded_channel()
}
