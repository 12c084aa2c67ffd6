use pinpoint_engine::config::{ConfigError, ConfigLoader, PinpointConfig};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = PinpointConfig::default();
    assert_eq!(config.resolver.default_timeout_ms, 30_000);
    assert_eq!(config.resolver.max_attempts, 5);
    assert_eq!(config.resolver.accept_score, 0.5);
    assert_eq!(config.resolver.early_stop_score, 0.9);
    assert_eq!(config.resolver.backoff_cap_secs, 5);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.dir, PathBuf::from("page_models"));
    assert_eq!(config.cache.ttl_secs, 3600);
    assert_eq!(config.cache.max_entries, 1000);
    assert_eq!(config.cache.fuzzy_threshold, 0.8);
    assert_eq!(config.discovery.dir, PathBuf::from(".page_models"));
    assert_eq!(config.discovery.max_elements, 200);
}

#[tokio::test]
async fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "resolver:\n  max_attempts: 2\n  debug: true\ncache:\n  ttl_secs: 60\n  dir: /tmp/pinpoint-cache\n"
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert_eq!(config.resolver.max_attempts, 2);
    assert!(config.resolver.debug);
    assert_eq!(config.resolver.default_timeout_ms, 30_000);
    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.cache.dir, PathBuf::from("/tmp/pinpoint-cache"));
    assert_eq!(config.cache.save_every, 5);
    assert!(config.discovery.enabled);
}

#[tokio::test]
async fn test_invalid_yaml_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "resolver: [unclosed").unwrap();

    let result = ConfigLoader::load_from(file.path()).await;
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[tokio::test]
async fn test_missing_file_is_an_io_error() {
    let result = ConfigLoader::load_from(std::path::Path::new("/nonexistent/pinpoint.yaml")).await;
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[tokio::test]
async fn test_discovery_can_be_disabled() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "discovery:\n  enabled: false\n").unwrap();

    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert!(!config.discovery.enabled);
    assert_eq!(config.discovery.max_elements, 200);
}
