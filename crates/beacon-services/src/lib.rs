//! Service logic for beacon — peer membership, inbound dispatch, and
//! outbound senders. Everything here is transport-facing but socket-free
//! enough to unit test; the daemon owns the actual listen loops.

pub mod handler;
pub mod inbound;
pub mod registry;
pub mod send;

pub use handler::MessageHandler;
pub use inbound::{inbound_channel, InboundMessage, InboundRx, InboundTx};
pub use registry::{new_registry, PeerRecord, Registry, SharedRegistry};
