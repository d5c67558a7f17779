use serde::Deserialize;

/// Top-level configuration settings for the bridge.
///
/// Includes settings for both the WebSocket server and the MQTT broker
/// the bridge connects out to.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
}

/// Configuration settings for the WebSocket server.
///
/// Defines the listen address, the bound on concurrent client sessions,
/// and the log level the process starts with.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub log_level: String,
}

/// Configuration settings for the backend MQTT broker.
///
/// `reconnect_interval_ms` is the fixed delay between connection attempts
/// made by a broker adapter; it is never retried at the session level.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub reconnect_interval_ms: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

/// Partial server settings.
///
/// Used when loading server configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
    pub log_level: Option<String>,
}

/// Partial broker settings.
///
/// Used for broker configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub reconnect_interval_ms: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// Ensures the bridge has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_connections: 1000,
                log_level: "info".to_string(),
            },
            broker: BrokerSettings {
                host: "127.0.0.1".to_string(),
                port: 1883,
                reconnect_interval_ms: 5000,
            },
        }
    }
}
