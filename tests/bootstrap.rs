//! End-to-end bootstrap through the top-level crate.

use std::io::Write;

use tether::{Config, TetherErrorKind};

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_validates() {
    let file = config_file(
        r#"
        [redis.direct]
        enabled = true
        addr = "127.0.0.1:6379"
        min_idle_conns = 10
        max_idle_conns = 5
        "#,
    );

    let err = tether::load_config(file.path(), Some("redis")).unwrap_err();
    assert_eq!(err.kind(), TetherErrorKind::ConfigurationInvalid);
    assert!(err.to_string().contains("direct configuration error"));
}

#[test]
fn test_load_config_root_tables() {
    let file = config_file(
        r#"
        [topology]
        enabled = true
        addrs = ["10.0.0.1:7000", "10.0.0.2:7000"]
        master_name = ""
        "#,
    );

    let config: Config = tether::load_config(file.path(), None).unwrap();
    assert!(config.enabled());
    assert_eq!(config.topology.unwrap().addrs.len(), 2);
}

#[tokio::test]
async fn test_boot_with_nothing_enabled() {
    let file = config_file("[redis]\n");

    let container = tether::boot_from_file(file.path(), "redis").await.unwrap();
    assert!(container.has("config"));
    assert!(!container.has("redis"));
}

#[tokio::test]
async fn test_boot_fails_when_server_unreachable() {
    let file = config_file(
        r#"
        [redis.direct]
        enabled = true
        addr = "127.0.0.1:6399"
        "#,
    );

    let err = tether::boot_from_file(file.path(), "redis").await.unwrap_err();
    assert_eq!(err.kind(), TetherErrorKind::ConnectionUnreachable);
}
