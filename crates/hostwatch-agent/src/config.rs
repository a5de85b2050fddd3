//! Agent configuration values.
//!
//! Parsing a configuration file is the launcher's concern; the core only
//! consumes an already-validated [`Config`]. The struct derives
//! `Deserialize` so any serde front end can produce it, and every field has
//! a default so partial configurations work.
//!
//! ## Edge Cases and Behaviors
//!
//! - Intervals of zero are rejected by [`Config::validate`].
//! - `log_file_paths` may name more files than the agent will follow; the
//!   source registry truncates to its cap (see `logs::source`).
//! - `log_group_name` is a template; `{instance}` is substituted with the
//!   instance identifier at startup.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

pub const DEFAULT_METRICS_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LOGS_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_CREDENTIAL_REFRESH_SECS: u64 = 3600;
pub const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_NAMESPACE: &str = "System/Default";
pub const DEFAULT_LOG_GROUP_TEMPLATE: &str = "/system/default/{instance}";

/// Placeholder substituted with the instance identifier in
/// [`Config::log_group_name`].
pub const INSTANCE_PLACEHOLDER: &str = "{instance}";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the telemetry backend.
    pub endpoint: String,

    /// Namespace every metric datum is published under.
    pub namespace: String,

    /// Log group name template; `{instance}` expands to the instance id.
    pub log_group_name: String,

    /// Seconds between metric sampling/publish ticks.
    pub metrics_collection_interval: u64,

    /// Seconds between log shipping ticks.
    pub logs_collection_interval: u64,

    /// Seconds between credential refresh attempts.
    pub credential_refresh_interval: u64,

    /// Log files to follow. Entries beyond the source cap are ignored.
    pub log_file_paths: Vec<PathBuf>,

    /// Whether to follow the system journal as an additional source.
    pub collect_journal: bool,

    /// Per-request timeout, in seconds, for backend calls.
    pub flush_timeout: u64,

    /// Compress log payload bodies with zstd.
    pub use_compression: bool,

    /// zstd compression level used when `use_compression` is set.
    pub compression_level: i32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: String::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            log_group_name: DEFAULT_LOG_GROUP_TEMPLATE.to_string(),
            metrics_collection_interval: DEFAULT_METRICS_INTERVAL_SECS,
            logs_collection_interval: DEFAULT_LOGS_INTERVAL_SECS,
            credential_refresh_interval: DEFAULT_CREDENTIAL_REFRESH_SECS,
            log_file_paths: Vec::new(),
            collect_journal: false,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT_SECS,
            use_compression: true,
            compression_level: 3,
        }
    }
}

impl Config {
    /// Expands the log group template for a concrete instance.
    #[must_use]
    pub fn log_group_for(&self, instance_id: &str) -> String {
        self.log_group_name.replace(INSTANCE_PLACEHOLDER, instance_id)
    }

    #[must_use]
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_collection_interval)
    }

    #[must_use]
    pub fn logs_interval(&self) -> Duration {
        Duration::from_secs(self.logs_collection_interval)
    }

    #[must_use]
    pub fn credential_refresh(&self) -> Duration {
        Duration::from_secs(self.credential_refresh_interval)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout)
    }

    /// Rejects configurations the core cannot run with.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.endpoint.trim().is_empty() {
            return Err(AgentError::InvalidConfig("endpoint is empty".to_string()));
        }
        if self.metrics_collection_interval == 0 {
            return Err(AgentError::InvalidConfig(
                "metrics_collection_interval must be greater than zero".to_string(),
            ));
        }
        if self.logs_collection_interval == 0 {
            return Err(AgentError::InvalidConfig(
                "logs_collection_interval must be greater than zero".to_string(),
            ));
        }
        if self.credential_refresh_interval == 0 {
            return Err(AgentError::InvalidConfig(
                "credential_refresh_interval must be greater than zero".to_string(),
            ));
        }
        if self.flush_timeout == 0 {
            return Err(AgentError::InvalidConfig(
                "flush_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            endpoint: "https://telemetry.example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.namespace, "System/Default");
        assert_eq!(config.log_group_name, "/system/default/{instance}");
        assert_eq!(config.metrics_collection_interval, 300);
        assert_eq!(config.logs_collection_interval, 10);
        assert_eq!(config.flush_timeout, 5);
        assert!(config.log_file_paths.is_empty());
        assert!(!config.collect_journal);
    }

    #[test]
    fn test_log_group_for_substitutes_instance() {
        let config = valid_config();
        assert_eq!(
            config.log_group_for("i-0abc123"),
            "/system/default/i-0abc123"
        );
    }

    #[test]
    fn test_log_group_for_without_placeholder() {
        let mut config = valid_config();
        config.log_group_name = "/fixed/group".to_string();
        assert_eq!(config.log_group_for("i-0abc123"), "/fixed/group");
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = valid_config();
        config.metrics_collection_interval = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.logs_collection_interval = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.credential_refresh_interval = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.flush_timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"endpoint":"https://t.example.com","collect_journal":true}"#)
                .unwrap();
        assert_eq!(config.endpoint, "https://t.example.com");
        assert!(config.collect_journal);
        assert_eq!(config.metrics_collection_interval, 300);
    }
}
