//! # Liveness Integration Tests
//!
//! Runs the default connection probe against real localhost sockets through a
//! discovery session.

use srv_discovery::{
    ConnectLivenessCheck, DiscoveryError, DiscoverySession, Endpoint, LivenessStrategy,
    SrvCandidate, StaticResolver,
};
use std::time::Duration;
use tokio::net::TcpListener;

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_session_prefers_reachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    let closed = closed_port().await;

    let session = DiscoverySession::builder("http", "tcp", "localhost")
        .resolver(StaticResolver::new(vec![
            SrvCandidate::new("127.0.0.1", closed, 0, 100),
            SrvCandidate::new("127.0.0.1", open, 0, 1),
        ]))
        .liveness(ConnectLivenessCheck::new(Duration::from_secs(1)))
        .build();

    session.refresh().await.unwrap();
    for _ in 0..3 {
        assert_eq!(session.choose().await, Endpoint::new("127.0.0.1", open));
    }

    let servers = session.servers();
    assert!(!servers[0].is_healthy());
    assert!(servers[1].is_healthy());
}

#[tokio::test]
async fn test_unknown_protocol_yields_no_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let session = DiscoverySession::builder("http", "xxx", "localhost")
        .resolver(StaticResolver::single("127.0.0.1", port))
        .build();

    session.refresh().await.unwrap();
    assert!(session.choose().await.is_empty());
    assert_eq!(session.stats().healthy_servers, 0);
}

#[tokio::test]
async fn test_probe_reports_unknown_network() {
    let probe = ConnectLivenessCheck::default();
    assert_eq!(probe.timeout(), Duration::from_secs(2));
    assert_eq!(
        probe.check("127.0.0.1", 80, "sctp").await,
        Err(DiscoveryError::unknown_network("sctp"))
    );
}

#[tokio::test]
async fn test_probe_refused_is_error() {
    let port = closed_port().await;
    let probe = ConnectLivenessCheck::default();

    match probe.check("127.0.0.1", port, "tcp").await {
        Err(DiscoveryError::HealthCheck { target, port: p, .. }) => {
            assert_eq!(target, "127.0.0.1");
            assert_eq!(p, port);
        }
        other => panic!("expected health check error, got {:?}", other),
    }
}
