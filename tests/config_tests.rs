//! # Configuration Loading Tests
//!
//! Loads YAML and JSON configuration files from disk and builds sessions from them.

use srv_discovery::{DiscoveryConfig, DiscoveryError, DiscoverySession, Endpoint};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_load_yaml_config() {
    let file = write_config(
        r#"
service: jabber
protocol: tcp
domain: registro.br
health_check_ttl: 10s
health_check_timeout: 500ms
refresh_interval: 30s
"#,
        ".yaml",
    );

    let config = DiscoveryConfig::load_from_file(file.path()).await.unwrap();
    assert_eq!(config.service, "jabber");
    assert_eq!(config.health_check_ttl, Duration::from_secs(10));
    assert_eq!(config.health_check_timeout, Duration::from_millis(500));
    assert_eq!(config.refresh_interval, Some(Duration::from_secs(30)));

    let session = DiscoverySession::from_config(&config).unwrap();
    assert_eq!(session.health_check_ttl(), Duration::from_secs(10));
    assert_eq!(session.domain(), "registro.br");
}

#[tokio::test]
async fn test_load_json_config() {
    let file = write_config(
        r#"{
  "service": "ldap",
  "protocol": "udp",
  "domain": "example.com",
  "health_check_ttl": "1s"
}"#,
        ".json",
    );

    let config = DiscoveryConfig::load_from_json(file.path()).await.unwrap();
    assert_eq!(config.protocol, "udp");
    assert_eq!(config.health_check_ttl, Duration::from_secs(1));
}

#[tokio::test]
async fn test_development_config_serves_fixed_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let file = write_config(
        &format!(
            r#"
service: jabber
domain: registro.br
development:
  target: 127.0.0.1
  port: {}
"#,
            port
        ),
        ".yaml",
    );

    let config = DiscoveryConfig::load_from_file(file.path()).await.unwrap();
    let session = DiscoverySession::from_config(&config).unwrap();
    session.refresh().await.unwrap();

    assert_eq!(session.choose().await, Endpoint::new("127.0.0.1", port));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let file = write_config(
        r#"
service: jabber
domain: ""
"#,
        ".yaml",
    );

    let result = DiscoveryConfig::load_from_file(file.path()).await;
    assert!(matches!(result, Err(DiscoveryError::Configuration { .. })));
}

#[tokio::test]
async fn test_malformed_yaml_is_yaml_error() {
    let file = write_config("service: [jabber\ndomain: registro.br\n", ".yaml");

    let err = DiscoveryConfig::load_from_file(file.path()).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Yaml { .. }), "got {:?}", err);
    assert_eq!(err.error_type(), "yaml_error");
}

#[tokio::test]
async fn test_malformed_json_is_json_error() {
    let file = write_config(r#"{ "service": "ldap", "domain": "#, ".json");

    let err = DiscoveryConfig::load_from_json(file.path()).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Json { .. }), "got {:?}", err);
    assert_eq!(err.error_type(), "json_error");
}

#[tokio::test]
async fn test_missing_file() {
    let result = DiscoveryConfig::load_from_file("/nonexistent/srv-discovery.yaml").await;
    match result {
        Err(DiscoveryError::Configuration { message }) => {
            assert!(message.contains("Failed to read config file"));
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
}
