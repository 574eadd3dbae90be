//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (queue size > 0, delays ordered)
//! - Check the metrics address parses when the endpoint is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: &ClientConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ClientConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("client.request_queue_size must be greater than 0")]
    ZeroQueueSize,

    #[error("reconnect.base_delay_ms must be greater than 0")]
    ZeroBaseDelay,

    #[error("reconnect.base_delay_ms ({base}) exceeds reconnect.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.client.request_queue_size == Some(0) {
        errors.push(ValidationError::ZeroQueueSize);
    }

    let reconnect = &config.reconnect;
    if reconnect.base_delay_ms == 0 {
        errors.push(ValidationError::ZeroBaseDelay);
    }
    if reconnect.base_delay_ms > reconnect.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: reconnect.base_delay_ms,
            max: reconnect.max_delay_ms,
        });
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ClientConfig::default();
        config.client.request_queue_size = Some(0);
        config.reconnect.base_delay_ms = 5000;
        config.reconnect.max_delay_ms = 100;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroQueueSize,
                ValidationError::DelayOrder { base: 5000, max: 100 },
                ValidationError::LogLevel("loud".into()),
                ValidationError::MetricsAddress("nowhere".into()),
            ]
        );
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = ClientConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
