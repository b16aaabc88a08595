use std::fs;
use switchboard::config::{ConfigLoader, TransportKind};
use tempfile::TempDir;

#[test]
fn toml_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("switchboard.toml");
    fs::write(
        &path,
        r#"
[server]
transport = "tcp"
port = 9100

[analysis]
history_limit = 5

[orchestrator]
relay_events = ["analysis-completed", "custom-event"]
"#,
    )
    .unwrap();

    let config = ConfigLoader::load(Some(path.as_path())).unwrap();
    assert_eq!(config.server.transport, TransportKind::Tcp);
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.analysis.history_limit, 5);
    assert_eq!(config.analysis.queue_capacity, 256);
    assert_eq!(config.orchestrator.relay_events.len(), 2);
}

#[test]
fn missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::load(Some(temp_dir.path().join("absent.toml").as_path()));
    assert!(result.is_err());
}
