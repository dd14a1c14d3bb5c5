//! Interactive menu — the caller-facing surface driving the outbound
//! senders. Pure I/O glue: every network operation runs synchronously in
//! this task and blocks the menu until it completes or fails.

use std::io::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use beacon_services::{send, PeerRecord, SharedRegistry};

type StdinLines = Lines<BufReader<Stdin>>;

#[derive(Clone, Copy)]
enum Transport {
    Stream,
    Datagram,
}

pub struct Menu {
    registry: SharedRegistry,
    username: String,
    stream_port: u16,
    datagram_port: u16,
}

impl Menu {
    pub fn new(
        registry: SharedRegistry,
        username: String,
        stream_port: u16,
        datagram_port: u16,
    ) -> Self {
        Self {
            registry,
            username,
            stream_port,
            datagram_port,
        }
    }

    /// Run the menu until the user exits or stdin closes.
    pub async fn run(self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print_menu();
            let Some(choice) = prompt(&mut lines, "Enter your choice: ").await? else {
                return Ok(());
            };

            match choice.trim() {
                "1" => self.send_text(&mut lines, Transport::Stream).await?,
                "2" => self.send_text(&mut lines, Transport::Datagram).await?,
                "3" => self.send_file(&mut lines, Transport::Stream).await?,
                "4" => self.send_file(&mut lines, Transport::Datagram).await?,
                "5" => self.broadcast(&mut lines).await?,
                "6" => self.display_peers(),
                "7" => {
                    println!("Exiting...");
                    return Ok(());
                }
                _ => println!("Invalid choice. Please try again."),
            }
        }
    }

    async fn send_text(&self, lines: &mut StdinLines, transport: Transport) -> Result<()> {
        let Some(peer) = self.select_peer(lines).await? else {
            return Ok(());
        };
        let Some(message) = prompt(lines, "Enter message to send: ").await? else {
            return Ok(());
        };

        let result = match transport {
            Transport::Stream => {
                let addr = SocketAddr::new(peer.addr, self.stream_port);
                send::send_text_stream(addr, &self.username, &message).await
            }
            Transport::Datagram => {
                let addr = SocketAddr::new(peer.addr, self.datagram_port);
                send::send_text_datagram(addr, &self.username, &message).await
            }
        };
        if let Err(e) = result {
            println!("Send failed: {e:#}");
        }
        Ok(())
    }

    async fn send_file(&self, lines: &mut StdinLines, transport: Transport) -> Result<()> {
        let Some(peer) = self.select_peer(lines).await? else {
            return Ok(());
        };
        let Some(path) = prompt(lines, "Enter file path: ").await? else {
            return Ok(());
        };
        let path = PathBuf::from(path.trim());

        match transport {
            Transport::Stream => {
                let addr = SocketAddr::new(peer.addr, self.stream_port);
                if let Err(e) = send::send_file_stream(addr, &path, &self.username).await {
                    println!("Send failed: {e:#}");
                }
            }
            Transport::Datagram => {
                // Text files only over the lossy transport, as shipped.
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    println!("Only .txt files are sent over the datagram transport.");
                    return Ok(());
                }
                let addr = SocketAddr::new(peer.addr, self.datagram_port);
                match send::send_file_datagram(addr, &path, &self.username).await {
                    Ok(chunks) => println!("Sent {chunks} chunks."),
                    Err(e) => println!("Send failed: {e:#}"),
                }
            }
        }
        Ok(())
    }

    async fn broadcast(&self, lines: &mut StdinLines) -> Result<()> {
        let Some(message) = prompt(lines, "Enter message to broadcast to peers: ").await? else {
            return Ok(());
        };

        let peers = self.registry.snapshot();
        if peers.is_empty() {
            println!("No peers to broadcast to.");
            return Ok(());
        }

        match send::broadcast_text(&peers, self.datagram_port, &self.username, &message).await {
            Ok(failures) => {
                println!("Delivered to {} peers, {failures} failed.", peers.len() - failures)
            }
            Err(e) => println!("Broadcast failed: {e:#}"),
        }
        Ok(())
    }

    async fn select_peer(&self, lines: &mut StdinLines) -> Result<Option<PeerRecord>> {
        self.display_peers();
        let Some(input) = prompt(lines, "Select the number of the peer: ").await? else {
            return Ok(None);
        };

        let peer = input
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| self.registry.by_index(i));
        if peer.is_none() {
            println!("Invalid peer selection.");
        }
        Ok(peer)
    }

    fn display_peers(&self) {
        let peers = self.registry.snapshot();
        println!("\nConnected Peers:");
        if peers.is_empty() {
            println!("  (none)");
        }
        for (i, peer) in peers.iter().enumerate() {
            println!("{}. {} - {}", i + 1, peer.username, peer.addr);
        }
    }
}

fn print_menu() {
    println!("\nMenu:");
    println!("1. Send TCP message");
    println!("2. Send UDP message");
    println!("3. Send a file using TCP");
    println!("4. Send a text file using UDP (only for .txt)");
    println!("5. Send broadcast message (all peers)");
    println!("6. Display connected peers");
    println!("7. Exit");
}

async fn prompt(lines: &mut StdinLines, text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush().ok();
    Ok(lines.next_line().await?)
}
