use super::{Settings, load_config};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.server.max_connections, 1000);
    assert_eq!(settings.server.log_level, "info");
    assert_eq!(settings.broker.host, "127.0.0.1");
    assert_eq!(settings.broker.port, 1883);
    assert_eq!(settings.broker.reconnect_interval_ms, 5000);
}

#[test]
#[serial]
fn load_config_reads_environment_overrides() {
    temp_env::with_vars(
        [
            ("SERVER_PORT", Some("9001")),
            ("BROKER_HOST", Some("broker.example.com")),
            ("BROKER_PORT", Some("8883")),
        ],
        || {
            let settings = load_config().expect("load config");
            assert_eq!(settings.server.port, 9001);
            assert_eq!(settings.broker.host, "broker.example.com");
            assert_eq!(settings.broker.port, 8883);
            // Untouched values fall back to defaults
            assert_eq!(settings.server.max_connections, 1000);
        },
    );
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // Run from a temporary directory so load_config picks up
    // config/default.toml from there.
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9100

        [broker]
        reconnect_interval_ms = 250
    "#;
    fs::write("config/default.toml", toml).expect("write config");

    let settings = load_config().expect("load config");

    env::set_current_dir(orig).expect("restore current dir");

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.broker.reconnect_interval_ms, 250);
    assert_eq!(settings.broker.port, 1883);
}
