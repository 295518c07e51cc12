mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    BrokerSettings, ChannelConfig, ServerSettings, Settings, StorageSettings,
};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, broker, storage, and
/// channel configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            max_connections: partial
                .broker
                .as_ref()
                .and_then(|b| b.max_connections)
                .unwrap_or(default.broker.max_connections),
            ack_timeout_ms: partial
                .broker
                .as_ref()
                .and_then(|b| b.ack_timeout_ms)
                .unwrap_or(default.broker.ack_timeout_ms),
            max_retries: partial
                .broker
                .as_ref()
                .and_then(|b| b.max_retries)
                .unwrap_or(default.broker.max_retries),
            max_qos: partial
                .broker
                .as_ref()
                .and_then(|b| b.max_qos)
                .unwrap_or(default.broker.max_qos),
            allowed_topic_prefixes: partial
                .broker
                .as_ref()
                .and_then(|b| b.allowed_topic_prefixes.clone())
                .unwrap_or(default.broker.allowed_topic_prefixes),
        },
        storage: StorageSettings {
            path: partial
                .storage
                .as_ref()
                .and_then(|s| s.path.clone())
                .unwrap_or(default.storage.path),
            history_ttl_secs: partial
                .storage
                .as_ref()
                .and_then(|s| s.history_ttl_secs)
                .unwrap_or(default.storage.history_ttl_secs),
        },
        channels: partial.channels.unwrap_or(default.channels),
    })
}
