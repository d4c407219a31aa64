//! Configuration file discovery and generation.
//!
//! # Configuration File Format
//!
//! ```toml
//! [provider]
//! kind = "ragflow"          # or "llamacloud"
//! timeout_ms = 30000
//!
//! [ragflow]
//! url = "http://localhost:9380"
//! api_key = "ragflow-xxxx"
//! dataset_ids = ["cebe5adc684a11f08afdb2ef6c1ade51"]
//! similarity_threshold = 0.2
//! vector_similarity_weight = 0.3
//!
//! [llamacloud]
//! api_key = "llx-xxxx"
//! base_url = "https://cloud.llamaindex.ai"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//! environment = "development"
//! request_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
const LOCAL_CONFIG_NAME: &str = "docsyte.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file already exists: {0}")]
    Exists(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Find a configuration file in the usual locations
///
/// Checks `./docsyte.toml` first, then `<config dir>/docsyte/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("docsyte").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Default location used by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("docsyte").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_NAME))
}

/// Write the default configuration as TOML
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::Exists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Keys picked up from the environment are not written to disk.
    let content = toml::to_string_pretty(&Config::default().redacted_for_file())?;
    std::fs::write(path, content)?;
    Ok(())
}

impl Config {
    fn redacted_for_file(&self) -> Self {
        let mut copy = self.clone();
        copy.ragflow.api_key = None;
        copy.llamacloud.api_key = None;
        copy
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use tempfile::tempdir;

    #[test]
    fn test_write_default_config_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path, false).unwrap();
        assert!(path.is_file());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[ragflow]"));
        assert!(!content.contains("api_key"));

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.provider.timeout_ms, 30_000);
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# existing").unwrap();

        let result = write_default_config(&path, false);
        assert!(matches!(result, Err(ConfigError::Exists(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# existing");

        write_default_config(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[provider]"));
    }

    #[test]
    fn test_to_toml_contains_sections() {
        let toml = Config::default().to_toml().unwrap();
        for section in ["[provider]", "[ragflow]", "[llamacloud]", "[server]", "[logging]"] {
            assert!(toml.contains(section), "missing {}", section);
        }
    }
}
