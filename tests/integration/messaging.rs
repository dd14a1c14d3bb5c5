//! Text messaging over both transports, plus the broadcast failure
//! isolation property.

use crate::*;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;

use beacon_services::{send, InboundMessage, PeerRecord};

/// Sending over the stream transport yields a decoded string carrying
/// the username and message verbatim.
#[tokio::test]
async fn stream_text_carries_username_and_message() -> Result<()> {
    let (addr, _storage, mut rx) = spawn_stream_listener("stream-text").await?;

    send::send_text_stream(addr, "alice", "hello over tcp").await?;

    match recv_inbound(&mut rx).await? {
        InboundMessage::Text(text) => {
            assert!(text.contains("alice"), "missing username: {text}");
            assert!(text.contains("hello over tcp"), "missing message: {text}");
        }
        other => panic!("expected a text item, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn datagram_text_carries_username_and_message() -> Result<()> {
    let (addr, mut rx) = spawn_datagram_listener().await?;

    send::send_text_datagram(addr, "bob", "hello over udp").await?;

    match recv_inbound(&mut rx).await? {
        InboundMessage::Text(text) => {
            assert!(text.contains("bob"), "missing username: {text}");
            assert!(text.contains("hello over udp"), "missing message: {text}");
        }
        other => panic!("expected a text item, got {other:?}"),
    }
    Ok(())
}

/// Broadcasting to three known peers where one address is unreachable
/// still delivers to the other two and reports exactly one failure.
#[tokio::test]
async fn broadcast_isolates_the_unreachable_peer() -> Result<()> {
    let receiver_a = UdpSocket::bind("127.0.0.1:0").await?;
    let port = receiver_a.local_addr()?.port();
    // Same port, distinct loopback address — broadcast targets one port
    // across all peers.
    let receiver_b = UdpSocket::bind(("127.0.0.2", port)).await?;

    let peers = vec![
        PeerRecord {
            username: "alice".into(),
            addr: "127.0.0.1".parse().unwrap(),
        },
        PeerRecord {
            username: "bob".into(),
            addr: "127.0.0.2".parse().unwrap(),
        },
        // IPv6 destination on the IPv4 broadcast socket: fails at send
        // time, standing in for an unreachable peer.
        PeerRecord {
            username: "ghost".into(),
            addr: "::1".parse().unwrap(),
        },
    ];

    let failures = send::broadcast_text(&peers, port, "carol", "to everyone").await?;
    assert_eq!(failures, 1, "exactly the unreachable peer should fail");

    let mut buf = [0u8; 128];
    for receiver in [&receiver_a, &receiver_b] {
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
            .await
            .context("broadcast never reached a live peer")??;
        assert_eq!(&buf[..len], b"carol: to everyone");
    }
    Ok(())
}
