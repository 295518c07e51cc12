use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the message broker, reading storage,
/// and the static channel table consumed by the channel directory.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub storage: StorageSettings,
    pub channels: Vec<ChannelConfig>,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the broker.
///
/// Controls connection limits, the QoS acknowledgment window and retry
/// budget, the server-side QoS ceiling, and the topic prefixes publishes
/// and subscriptions are allowed to touch.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub max_connections: usize,
    pub ack_timeout_ms: i64,
    pub max_retries: u8,
    pub max_qos: u8,
    pub allowed_topic_prefixes: Vec<String>,
}

/// Configuration settings for reading storage.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: String,
    /// Readings older than this are swept on read. Zero disables the sweep.
    pub history_ttl_secs: i64,
}

/// One channel known to the static directory.
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    pub id: String,
    pub write_key: String,
    #[serde(default)]
    pub read_key: String,
    #[serde(default)]
    pub public: bool,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub storage: Option<PartialStorageSettings>,
    pub channels: Option<Vec<ChannelConfig>>,
}

/// Partial server settings.
///
/// Used when loading server configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial broker settings.
///
/// Used for broker configuration from external sources with optional values.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub ack_timeout_ms: Option<i64>,
    pub max_retries: Option<u8>,
    pub max_qos: Option<u8>,
    pub allowed_topic_prefixes: Option<Vec<String>>,
}

/// Partial storage settings.
#[derive(Debug, Deserialize)]
pub struct PartialStorageSettings {
    pub path: Option<String>,
    pub history_ttl_secs: Option<i64>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                max_connections: 1000,
                ack_timeout_ms: 3000,
                max_retries: 5,
                max_qos: 2,
                allowed_topic_prefixes: vec!["sensors".to_string()],
            },
            storage: StorageSettings {
                path: "airwave_db".to_string(),
                history_ttl_secs: 0,
            },
            channels: Vec::new(),
        }
    }
}
