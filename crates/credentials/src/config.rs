use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CredentialsError, Result};

pub const CONFIG_FILENAME: &str = "credentials.json";

pub const DEFAULT_MAX_QUERY_LENGTH: usize = 4096;
pub const DEFAULT_MAX_QUERY_DEPTH: usize = 256;
pub const DEFAULT_KEY_PURPOSE: &str = "credentials.secret-bytes";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub query: QueryConfig,
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Longest query text, in bytes, accepted before lexing.
    pub max_length: usize,
    /// Deepest nesting of `(` and `!` accepted by the parser.
    pub max_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_QUERY_LENGTH,
            max_depth: DEFAULT_MAX_QUERY_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// HKDF info string for the secret encryption key.
    pub key_purpose: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            key_purpose: DEFAULT_KEY_PURPOSE.to_string(),
        }
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

/// Loads the configuration at `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<CredentialsConfig> {
    if !path.exists() {
        log::debug!("no credentials config at {}, using defaults", path.display());
        return Ok(CredentialsConfig::default());
    }

    let data = std::fs::read_to_string(path)?;
    let config: CredentialsConfig = serde_json::from_str(&data).map_err(|error| {
        CredentialsError::Config(format!(
            "failed to parse credentials config {}: {error}",
            path.display()
        ))
    })?;
    log::debug!("loaded credentials config from {}", path.display());
    Ok(config)
}

pub fn write_config(path: &Path, config: &CredentialsConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        CredentialsError::Config(format!(
            "failed to serialize credentials config {}: {error}",
            path.display()
        ))
    })?;
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = load_config(&config_path(dir.path())).expect("load");
        assert_eq!(config, CredentialsConfig::default());
        assert_eq!(config.query.max_length, 4096);
        assert_eq!(config.query.max_depth, 256);
        assert_eq!(config.secrets.key_purpose, "credentials.secret-bytes");
    }

    #[test]
    fn writes_and_loads_config() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILENAME);
        let mut original = CredentialsConfig::default();
        original.query.max_length = 256;
        original.query.max_depth = 16;
        original.secrets.key_purpose = "tests".to_string();

        write_config(&path, &original).expect("write config");
        let loaded = load_config(&path).expect("load config");
        assert_eq!(loaded, original);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = config_path(dir.path());
        std::fs::write(&path, r#"{ "query": { "max_length": 10 } }"#).expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.query.max_length, 10);
        assert_eq!(config.query.max_depth, DEFAULT_MAX_QUERY_DEPTH);
        assert_eq!(config.secrets, SecretsConfig::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempdir().expect("tempdir");
        let path = config_path(dir.path());
        std::fs::write(&path, "{ not json").expect("write");

        let err = load_config(&path).expect_err("expected error");
        match err {
            CredentialsError::Config(message) => assert!(message.contains("parse")),
            other => panic!("expected Config, got {other:?}"),
        }
    }
}
