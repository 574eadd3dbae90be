//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration. `.json` files are read as JSON,
/// everything else as TOML.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content)?,
        _ => parse_toml(&content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

pub fn parse_toml(content: &str) -> Result<ClientConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

pub fn parse_json(content: &str) -> Result<ClientConfig, ConfigError> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PendingHandoff;

    #[test]
    fn test_json_and_toml_agree() {
        let from_toml = parse_toml("[client]\npending_handoff = \"follow_auto_reconnect\"\n").unwrap();
        let from_json = parse_json(r#"{"client": {"pending_handoff": "follow_auto_reconnect"}}"#).unwrap();
        assert_eq!(from_toml, from_json);
        assert_eq!(from_json.client.pending_handoff, PendingHandoff::FollowAutoReconnect);
    }

    #[test]
    fn test_loads_and_validates_file() {
        let dir = std::env::temp_dir().join(format!("cluster-node-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.toml");
        fs::write(&good, "[client]\nauto_reconnect = false\n").unwrap();
        let config = load_config(&good).unwrap();
        assert!(!config.client.auto_reconnect);

        let bad = dir.join("bad.json");
        fs::write(&bad, r#"{"client": {"request_queue_size": 0}}"#).unwrap();
        let err = load_config(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e == &[ValidationError::ZeroQueueSize]));
        assert!(err.to_string().contains("request_queue_size"));

        let missing = load_config(&dir.join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));

        fs::remove_dir_all(&dir).ok();
    }
}
