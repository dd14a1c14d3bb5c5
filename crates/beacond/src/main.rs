//! beacond — LAN peer discovery and messaging daemon.

use std::io::Write as _;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, UdpSocket};

use beacon_core::config::BeaconConfig;
use beacon_services::{inbound_channel, new_registry, MessageHandler};

use beacond::{datagram::DatagramListener, discovery, menu::Menu, stream::StreamListener};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = BeaconConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = BeaconConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        BeaconConfig::default()
    });

    let username = match std::env::args().nth(1) {
        Some(name) => name,
        None if !config.identity.username.is_empty() => config.identity.username.clone(),
        None => prompt_username()?,
    };
    tracing::info!(username, "beacond starting");

    // Shared state
    let registry = new_registry();
    let (inbound_tx, inbound_rx) = inbound_channel();
    let handler = MessageHandler::new(config.storage.storage_path.clone())
        .context("failed to prepare storage directory")?;
    tracing::info!(path = %config.storage.storage_path.display(), "file storage path");

    // Bind all listeners up front — a failed bind is fatal, since no
    // discovery or messaging can function without it.
    let stream_listener = TcpListener::bind(("0.0.0.0", config.network.stream_port))
        .await
        .with_context(|| format!("failed to bind TCP port {}", config.network.stream_port))?;
    let datagram_socket = UdpSocket::bind(("0.0.0.0", config.network.datagram_port))
        .await
        .with_context(|| format!("failed to bind UDP port {}", config.network.datagram_port))?;
    let discovery_socket = discovery::bind_discovery_socket(config.network.discovery_port)
        .with_context(|| {
            format!("failed to bind discovery port {}", config.network.discovery_port)
        })?;

    let broadcast_dest: SocketAddr = format!(
        "{}:{}",
        config.network.broadcast_addr, config.network.discovery_port
    )
    .parse()
    .context("invalid broadcast address in config")?;

    // ── Spawn tasks ──────────────────────────────────────────────────────────
    // All daemon-like: they never block shutdown, which is simply the menu
    // returning from main.

    {
        let username = username.clone();
        let interval = config.discovery.interval_secs;
        tokio::spawn(async move {
            if let Err(e) = discovery::broadcast_loop(broadcast_dest, username, interval).await {
                tracing::error!(error = %e, "heartbeat broadcast failed");
            }
        });
    }

    {
        let registry = registry.clone();
        let timeout = Duration::from_secs(config.discovery.peer_timeout_secs);
        tokio::spawn(async move {
            if let Err(e) = discovery::listener_loop(discovery_socket, registry, timeout).await {
                tracing::error!(error = %e, "discovery listener failed");
            }
        });
    }

    {
        let listener = StreamListener::new(
            stream_listener,
            inbound_tx.clone(),
            config.storage.storage_path.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                tracing::error!(error = %e, "stream listener failed");
            }
        });
    }

    {
        let listener = DatagramListener::new(datagram_socket, inbound_tx.clone());
        tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                tracing::error!(error = %e, "datagram listener failed");
            }
        });
    }

    tokio::spawn(handler.run(inbound_rx));

    // ── Interactive menu ─────────────────────────────────────────────────────

    Menu::new(
        registry,
        username,
        config.network.stream_port,
        config.network.datagram_port,
    )
    .run()
    .await
}

fn prompt_username() -> Result<String> {
    print!("Enter your username: ");
    std::io::stdout().flush().ok();
    let mut name = String::new();
    std::io::stdin()
        .read_line(&mut name)
        .context("failed to read username")?;
    let name = name.trim().to_string();
    anyhow::ensure!(!name.is_empty(), "username must not be empty");
    Ok(name)
}
