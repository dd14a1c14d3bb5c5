//! Daemon runtime for beacon — the long-running discovery and transport
//! tasks plus the interactive menu. `main.rs` only wires these together;
//! keeping the loops here lets the integration tests drive them over
//! loopback sockets.

pub mod datagram;
pub mod discovery;
pub mod menu;
pub mod stream;
