//! UDP Transport Tests (thudp-transport)
//!
//! Tests for the UDP transport implementation including:
//! - Binding and local address
//! - Exact-size framing
//! - Broadcast and address reuse options
//! - Use through the transport trait

use std::time::Duration;
use thudp_transport::{DatagramTransport, TransportError, UdpConfig, UdpTransport};

const FRAME: usize = 32;

async fn pair() -> (UdpTransport, UdpTransport) {
    let a = UdpTransport::bind("127.0.0.1:0")
        .await
        .expect("Bind should succeed");
    let b = UdpTransport::bind("127.0.0.1:0")
        .await
        .expect("Bind should succeed");
    (a, b)
}

// ============================================================================
// Basic Binding Tests
// ============================================================================

#[tokio::test]
async fn test_udp_bind_specific_port() {
    // Find an available port
    let scratch = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = scratch.local_addr().unwrap().port();
    drop(scratch);

    let transport = UdpTransport::bind(&format!("127.0.0.1:{}", port))
        .await
        .expect("Bind to specific port should succeed");

    assert_eq!(transport.local_addr().unwrap().port(), port);
}

#[tokio::test]
async fn test_udp_bind_conflict_by_default() {
    let first = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = first.local_addr().unwrap().to_string();

    let result = UdpTransport::bind(&addr).await;

    match result {
        Err(TransportError::BindFailed { addr: failed, .. }) => assert_eq!(failed, addr),
        other => panic!("expected BindFailed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_udp_shared_port_with_reuse() {
    let shared = UdpConfig {
        reuse_address: true,
        ..Default::default()
    };
    let first = UdpTransport::bind_with_config("127.0.0.1:0", shared.clone())
        .await
        .unwrap();
    let addr = first.local_addr().unwrap().to_string();

    let second = UdpTransport::bind_with_config(&addr, shared)
        .await
        .expect("both sockets opted into address reuse");
    assert_eq!(second.local_addr().unwrap(), first.local_addr().unwrap());
}

#[tokio::test]
async fn test_udp_broadcast_option() {
    let transport = UdpTransport::bind_with_config(
        "0.0.0.0:0",
        UdpConfig {
            broadcast: true,
            ..Default::default()
        },
    )
    .await
    .expect("Broadcast bind should succeed");

    transport.set_broadcast(false).expect("Should toggle broadcast");
    transport.set_broadcast(true).expect("Should toggle broadcast");
}

// ============================================================================
// Framing Tests
// ============================================================================

#[tokio::test]
async fn test_udp_exact_frame_accepted() {
    let (a, b) = pair().await;
    let payload = vec![0x5au8; FRAME];

    a.send_to(&payload, b.local_addr().unwrap()).await.unwrap();

    let (data, from) = tokio::time::timeout(Duration::from_secs(2), b.recv_frame(FRAME))
        .await
        .expect("timeout")
        .expect("recv failed");
    assert_eq!(data.as_ref(), payload.as_slice());
    assert_eq!(from, a.local_addr().unwrap());
}

#[tokio::test]
async fn test_udp_off_by_one_frames_rejected() {
    let (a, b) = pair().await;
    let target = b.local_addr().unwrap();

    for len in [FRAME - 1, FRAME + 1] {
        a.send_to(&vec![0u8; len], target).await.unwrap();

        let err = tokio::time::timeout(Duration::from_secs(2), b.recv_frame(FRAME))
            .await
            .expect("timeout")
            .unwrap_err();
        assert!(err.is_framing());
        match err {
            TransportError::Framing {
                expected, actual, ..
            } => {
                assert_eq!(expected, FRAME);
                assert_eq!(actual, len);
            }
            other => panic!("expected Framing, got {:?}", other),
        }
    }

    // A rejected datagram does not disturb the next one
    a.send_to(&[1u8; FRAME], target).await.unwrap();
    let (data, _) = tokio::time::timeout(Duration::from_secs(2), b.recv_frame(FRAME))
        .await
        .expect("timeout")
        .unwrap();
    assert_eq!(data.len(), FRAME);
}

#[tokio::test]
async fn test_udp_frame_larger_than_packet_limit() {
    let a = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let b = UdpTransport::bind_with_config(
        "127.0.0.1:0",
        UdpConfig {
            max_packet_size: 16,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    // The receive buffer grows past the configured limit for larger frames
    a.send_to(&[7u8; FRAME], b.local_addr().unwrap())
        .await
        .unwrap();
    let (data, _) = tokio::time::timeout(Duration::from_secs(2), b.recv_frame(FRAME))
        .await
        .expect("timeout")
        .unwrap();
    assert_eq!(data.len(), FRAME);
}

// ============================================================================
// Trait Object Tests
// ============================================================================

async fn echo_through(transport: &dyn DatagramTransport, peer: &UdpTransport) -> usize {
    let target = peer.local_addr().unwrap();
    transport.send_to(&[9u8; FRAME], target).await.unwrap();
    let (data, from) = peer.recv_frame(FRAME).await.unwrap();
    peer.send_to(&data, from).await.unwrap();
    transport.recv_frame(FRAME).await.unwrap().0.len()
}

#[tokio::test]
async fn test_udp_through_trait_object() {
    let (a, b) = pair().await;
    let len = tokio::time::timeout(Duration::from_secs(2), echo_through(&a, &b))
        .await
        .expect("timeout");
    assert_eq!(len, FRAME);
    assert!(DatagramTransport::local_addr(&a).is_ok());
}
