//! Replica configuration with TOML file support.

use hyperdrive_network::DEFAULT_DEDUP_CAPACITY;
use hyperdrive_types::{quorum, Height, Rank};
use hyperdrive_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::NodeError;

/// Configuration for one replica.
///
/// Loaded with [`ReplicaConfig::from_toml_file`] or built in code (tests,
/// simulations). Call [`ReplicaConfig::validate`] before use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// This replica's position in the validator set.
    pub index: usize,

    /// Number of validators.
    pub validators: usize,

    /// Signatures needed to certify a prepare or commit. Defaults to `2f + 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,

    /// Signatures needed to certify a fault. Defaults to `2f + 1`; `0`
    /// escalates every individually signed fault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_threshold: Option<usize>,

    /// Height the replica starts at.
    #[serde(default = "default_start_height")]
    pub start_height: Height,

    /// Rank the replica starts at.
    #[serde(default)]
    pub start_rank: Rank,

    /// Capacity of every internal stream.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Number of recent deliveries remembered by the duplicate filters.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_start_height() -> Height {
    1
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_dedup_capacity() -> usize {
    DEFAULT_DEDUP_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ReplicaConfig {
    /// Defaults for replica `index` of `validators`.
    pub fn new(index: usize, validators: usize) -> Self {
        Self {
            index,
            validators,
            threshold: None,
            fault_threshold: None,
            start_height: default_start_height(),
            start_rank: 0,
            channel_capacity: default_channel_capacity(),
            dedup_capacity: default_dedup_capacity(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Prepare/commit threshold in effect.
    pub fn threshold(&self) -> usize {
        self.threshold.unwrap_or_else(|| quorum(self.validators))
    }

    /// Fault threshold in effect.
    pub fn fault_threshold(&self) -> usize {
        self.fault_threshold
            .unwrap_or_else(|| quorum(self.validators))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.validators == 0 {
            return Err(NodeError::Config("validator set is empty".into()));
        }
        if self.index >= self.validators {
            return Err(NodeError::Config(format!(
                "index {} out of range for {} validators",
                self.index, self.validators
            )));
        }
        if self.threshold() > self.validators {
            return Err(NodeError::Config(format!(
                "threshold {} exceeds {} validators",
                self.threshold(),
                self.validators
            )));
        }
        if self.fault_threshold() > self.validators {
            return Err(NodeError::Config(format!(
                "fault threshold {} exceeds {} validators",
                self.fault_threshold(),
                self.validators
            )));
        }
        if self.channel_capacity == 0 {
            return Err(NodeError::Config("channel_capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ReplicaConfig::from_toml_str("index = 2\nvalidators = 4").unwrap();
        assert_eq!(config, ReplicaConfig::new(2, 4));
        assert_eq!(config.threshold(), 3);
        assert_eq!(config.fault_threshold(), 3);
        assert_eq!(config.log_format, LogFormat::Human);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            index = 0
            validators = 7
            fault_threshold = 0
            channel_capacity = 16
            log_format = "json"
        "#;
        let config = ReplicaConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.threshold(), 5);
        assert_eq!(config.fault_threshold(), 0);
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = ReplicaConfig::new(1, 4);
        config.threshold = Some(4);
        let parsed = ReplicaConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "index = 3\nvalidators = 4\nstart_height = 10").unwrap();
        let config = ReplicaConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.start_height, 10);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = ReplicaConfig::from_toml_file("/nonexistent/hyperdrive.toml").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn validate_rejects_inconsistent_settings() {
        assert!(ReplicaConfig::new(0, 0).validate().is_err());
        assert!(ReplicaConfig::new(4, 4).validate().is_err());

        let mut config = ReplicaConfig::new(0, 4);
        config.threshold = Some(5);
        assert!(config.validate().is_err());

        let mut config = ReplicaConfig::new(0, 4);
        config.channel_capacity = 0;
        assert!(config.validate().is_err());
    }
}
