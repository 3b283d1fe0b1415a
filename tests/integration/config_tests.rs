//! Configuration loading tests

use std::io::Write;

use filtergate::config::Config;

#[tokio::test]
async fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
server:
  host: "127.0.0.1"
  port: 9100
database:
  enabled: true
  url: "sqlite::memory:"
  max_connections: 1
filtering:
  default_organization_id: "org-test"
  filter_responses: true
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).await.unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9100);
    assert!(config.database.enabled);
    assert_eq!(config.filtering.default_organization_id, "org-test");
    assert!(config.filtering.filter_responses);
    assert!(config.filtering.log_violations);
}

#[tokio::test]
async fn test_missing_config_file_errors() {
    let err = Config::from_file("/nonexistent/gateway.yaml").await.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[tokio::test]
async fn test_malformed_config_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "server: [not, a, mapping]").unwrap();

    let err = Config::from_file(file.path()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}
