//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a cluster
//! client's node connections. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-node connection options.
    pub client: ClientOptions,

    /// Reconnect watchdog pacing.
    pub reconnect: ReconnectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Whether pending-buffer commands follow the auto-reconnect gate on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PendingHandoff {
    /// Hand off pending commands whenever a router exists. They were never
    /// written, so another node can always take them.
    #[default]
    Always,
    /// Hand off pending commands only when auto-reconnect is enabled.
    FollowAutoReconnect,
}

/// Options read by a node connection. Read-only once the node is built.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientOptions {
    /// Reconnect automatically and allow in-flight hand-off on close.
    pub auto_reconnect: bool,

    /// Hand-off policy for commands that were never written.
    pub pending_handoff: PendingHandoff,

    /// Maximum in-flight + pending commands per node. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_queue_size: Option<usize>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            pending_handoff: PendingHandoff::default(),
            request_queue_size: None,
        }
    }
}

/// Reconnect backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,

    /// Attempts before giving up. 0 retries forever.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            max_delay_ms: 30_000,
            max_attempts: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.client.auto_reconnect);
        assert_eq!(config.client.pending_handoff, PendingHandoff::Always);
    }

    #[test]
    fn test_follow_auto_reconnect_is_opt_in() {
        let config: ClientConfig = toml::from_str(
            r#"
            [client]
            pending_handoff = "follow_auto_reconnect"
            "#,
        )
        .unwrap();
        assert_eq!(config.client.pending_handoff, PendingHandoff::FollowAutoReconnect);
    }

    #[test]
    fn test_parses_sections() {
        let config: ClientConfig = toml::from_str(
            r#"
            [client]
            auto_reconnect = false
            pending_handoff = "follow_auto_reconnect"
            request_queue_size = 64

            [reconnect]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert!(!config.client.auto_reconnect);
        assert_eq!(config.client.pending_handoff, PendingHandoff::FollowAutoReconnect);
        assert_eq!(config.client.request_queue_size, Some(64));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.base_delay_ms, 100);
    }
}
