//! Datagram listener — classifies each received datagram and forwards it
//! into the inbound queue. File-tagged datagrams go through unparsed; the
//! handler owns the header parsing.

use anyhow::Result;
use bytes::Bytes;
use tokio::net::UdpSocket;

use beacon_core::frame;
use beacon_services::{InboundMessage, InboundTx};

pub struct DatagramListener {
    socket: UdpSocket,
    queue: InboundTx,
}

impl DatagramListener {
    pub fn new(socket: UdpSocket, queue: InboundTx) -> Self {
        Self { socket, queue }
    }

    /// Receive datagrams forever — cancel by dropping the task handle.
    /// Per-datagram failures never end the loop.
    pub async fn run(self) -> Result<()> {
        let mut buf = vec![0u8; frame::UDP_PACKET_SIZE];

        tracing::info!(addr = %self.socket.local_addr()?, "datagram listener starting");

        loop {
            let (len, peer_addr) = match self.socket.recv_from(&mut buf).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "recv_from failed");
                    continue;
                }
            };
            let payload = &buf[..len];

            if frame::is_file_tagged(payload) {
                let _ = self
                    .queue
                    .send(InboundMessage::FileChunk(Bytes::copy_from_slice(payload)));
            } else {
                match std::str::from_utf8(payload) {
                    Ok(text) => {
                        let _ = self
                            .queue
                            .send(InboundMessage::Text(format!("UDP from {peer_addr}: {text}")));
                    }
                    Err(_) => {
                        tracing::warn!(peer = %peer_addr, "dropping malformed UTF-8 datagram");
                    }
                }
            }
        }
    }
}
