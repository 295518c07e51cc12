//! The `directory` module is the seam to the channel directory collaborator.
//!
//! The core never creates, lists, or deletes channels; it only asks whether
//! a channel exists, whether a credential matches, and whether the channel
//! is publicly readable. Credentials are opaque shared secrets compared for
//! equality, nothing stronger.

use std::collections::HashMap;

use crate::config::ChannelConfig;

/// Channel existence and credential checks.
pub trait ChannelDirectory: Send + Sync {
    fn exists(&self, channel_id: &str) -> bool;
    fn validate_write_credential(&self, channel_id: &str, secret: &str) -> bool;
    fn validate_read_credential(&self, channel_id: &str, secret: &str) -> bool;
    fn is_public(&self, channel_id: &str) -> bool;
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    write_key: String,
    read_key: String,
    public: bool,
}

/// Directory backed by the channels table in the configuration file.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    channels: HashMap<String, ChannelEntry>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(channels: &[ChannelConfig]) -> Self {
        let channels = channels
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    ChannelEntry {
                        write_key: c.write_key.clone(),
                        read_key: c.read_key.clone(),
                        public: c.public,
                    },
                )
            })
            .collect();
        Self { channels }
    }

    /// Register a channel directly; used by tests and the demo setup.
    pub fn add_channel(&mut self, id: &str, write_key: &str, read_key: &str, public: bool) {
        self.channels.insert(
            id.to_string(),
            ChannelEntry {
                write_key: write_key.to_string(),
                read_key: read_key.to_string(),
                public,
            },
        );
    }
}

impl ChannelDirectory for StaticDirectory {
    fn exists(&self, channel_id: &str) -> bool {
        self.channels.contains_key(channel_id)
    }

    fn validate_write_credential(&self, channel_id: &str, secret: &str) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|c| c.write_key == secret)
    }

    fn validate_read_credential(&self, channel_id: &str, secret: &str) -> bool {
        self.channels
            .get(channel_id)
            .is_some_and(|c| c.read_key == secret)
    }

    fn is_public(&self, channel_id: &str) -> bool {
        self.channels.get(channel_id).is_some_and(|c| c.public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        let mut dir = StaticDirectory::new();
        dir.add_channel("c1", "wkey", "rkey", false);
        dir.add_channel("open", "wkey2", "", true);
        dir
    }

    #[test]
    fn test_exists() {
        let dir = directory();
        assert!(dir.exists("c1"));
        assert!(!dir.exists("missing"));
    }

    #[test]
    fn test_credentials() {
        let dir = directory();
        assert!(dir.validate_write_credential("c1", "wkey"));
        assert!(!dir.validate_write_credential("c1", "rkey"));
        assert!(dir.validate_read_credential("c1", "rkey"));
        assert!(!dir.validate_read_credential("missing", "rkey"));
    }

    #[test]
    fn test_is_public() {
        let dir = directory();
        assert!(!dir.is_public("c1"));
        assert!(dir.is_public("open"));
        assert!(!dir.is_public("missing"));
    }
}
