//! Configuration management.
//!
//! Configuration is layered: built-in defaults (which honour the conventional
//! `RAGFLOW_URL`, `RAGFLOW_API_KEY`, `LLAMACLOUD_API_KEY`, `HOST`, `PORT` and
//! `DOCSYTE_ENV` variables), then an optional TOML file, then
//! `DOCSYTE__<SECTION>__<KEY>` environment variables.

mod file_config;

pub use file_config::{default_config_path, find_config_file, write_default_config, ConfigError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default RAGFlow endpoint for a local deployment
pub const DEFAULT_RAGFLOW_URL: &str = "http://localhost:9380";

/// Default LlamaCloud endpoint
pub const DEFAULT_LLAMACLOUD_URL: &str = "https://cloud.llamaindex.ai";

/// Dataset searched when none is configured
pub const DEFAULT_DATASET_ID: &str = "cebe5adc684a11f08afdb2ef6c1ade51";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which RAG backend to use and how long to wait for it
    #[serde(default)]
    pub provider: ProviderConfig,

    /// RAGFlow settings
    #[serde(default)]
    pub ragflow: RagflowConfig,

    /// LlamaCloud settings
    #[serde(default)]
    pub llamacloud: LlamaCloudConfig,

    /// Hosted HTTP transport settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// RAG backend kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ragflow,
    LlamaCloud,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ragflow => write!(f, "ragflow"),
            ProviderKind::LlamaCloud => write!(f, "llamacloud"),
        }
    }
}

/// Provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ProviderConfig {
    /// Per-call timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// RAGFlow connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagflowConfig {
    #[serde(default = "default_ragflow_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Datasets passed to the retrieval endpoint
    #[serde(default = "default_dataset_ids")]
    pub dataset_ids: Vec<String>,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_vector_similarity_weight")]
    pub vector_similarity_weight: f64,
}

impl Default for RagflowConfig {
    fn default() -> Self {
        Self {
            url: default_ragflow_url(),
            api_key: std::env::var("RAGFLOW_API_KEY").ok(),
            dataset_ids: default_dataset_ids(),
            similarity_threshold: default_similarity_threshold(),
            vector_similarity_weight: default_vector_similarity_weight(),
        }
    }
}

fn default_ragflow_url() -> String {
    std::env::var("RAGFLOW_URL").unwrap_or_else(|_| DEFAULT_RAGFLOW_URL.to_string())
}

fn default_dataset_ids() -> Vec<String> {
    vec![DEFAULT_DATASET_ID.to_string()]
}

fn default_similarity_threshold() -> f64 {
    0.2
}

fn default_vector_similarity_weight() -> f64 {
    0.3
}

/// LlamaCloud connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlamaCloudConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llamacloud_url")]
    pub base_url: String,
}

impl Default for LlamaCloudConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("LLAMACLOUD_API_KEY").ok(),
            base_url: default_llamacloud_url(),
        }
    }
}

fn default_llamacloud_url() -> String {
    DEFAULT_LLAMACLOUD_URL.to_string()
}

/// Deployment environment of the hosted server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Hosted HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// How long a forwarded request may wait for its response
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_host() -> String {
    std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

fn default_environment() -> Environment {
    match std::env::var("DOCSYTE_ENV").as_deref() {
        Ok("production") => Environment::Production,
        _ => Environment::Development,
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Check values that serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        match self.provider.kind {
            ProviderKind::Ragflow => {
                url::Url::parse(&self.ragflow.url).map_err(|e| {
                    ConfigError::Invalid(format!("ragflow.url '{}': {}", self.ragflow.url, e))
                })?;
                if self.ragflow.dataset_ids.is_empty() {
                    return Err(ConfigError::Invalid(
                        "ragflow.dataset_ids must name at least one dataset".to_string(),
                    ));
                }
            }
            ProviderKind::LlamaCloud => {
                url::Url::parse(&self.llamacloud.base_url).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "llamacloud.base_url '{}': {}",
                        self.llamacloud.base_url, e
                    ))
                })?;
                if self.llamacloud.api_key.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Invalid(
                        "llamacloud.api_key is required for the llamacloud provider".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Copy of the configuration with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.ragflow.api_key = mask(&self.ragflow.api_key);
        copy.llamacloud.api_key = mask(&self.llamacloud.api_key);
        copy
    }
}

/// Load configuration from defaults, an optional file and `DOCSYTE__*` variables
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("DOCSYTE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ragflow.dataset_ids")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.kind, ProviderKind::Ragflow);
        assert_eq!(config.provider.timeout_ms, 30_000);
        assert_eq!(config.provider.timeout(), Duration::from_secs(30));
        assert_eq!(config.ragflow.dataset_ids, vec![DEFAULT_DATASET_ID]);
        assert_eq!(config.ragflow.similarity_threshold, 0.2);
        assert_eq!(config.ragflow.vector_similarity_weight, 0.3);
        assert_eq!(config.llamacloud.base_url, DEFAULT_LLAMACLOUD_URL);
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[provider]
kind = "ragflow"
timeout_ms = 5000

[ragflow]
url = "http://ragflow.internal:9380"
api_key = "secret"
dataset_ids = ["a", "b"]

[server]
port = 8080
environment = "production"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.provider.timeout_ms, 5000);
        assert_eq!(config.ragflow.url, "http://ragflow.internal:9380");
        assert_eq!(config.ragflow.api_key.as_deref(), Some("secret"));
        assert_eq!(config.ragflow.dataset_ids, vec!["a", "b"]);
        assert_eq!(config.server.port, 8080);
        assert!(config.server.environment.is_production());
        assert_eq!(config.logging.format, "json");
        // untouched sections keep their defaults
        assert_eq!(config.ragflow.similarity_threshold, 0.2);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/docsyte.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.ragflow.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_llamacloud_requires_key() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::LlamaCloud;
        config.llamacloud.api_key = None;
        assert!(config.validate().is_err());

        config.llamacloud.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.provider.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = Config::default();
        config.ragflow.api_key = Some("secret".to_string());
        config.llamacloud.api_key = None;

        let redacted = config.redacted();
        assert_eq!(redacted.ragflow.api_key.as_deref(), Some("********"));
        assert!(redacted.llamacloud.api_key.is_none());
        assert_eq!(config.ragflow.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_provider_kind_serde() {
        let kind: ProviderKind = serde_json::from_str("\"llamacloud\"").unwrap();
        assert_eq!(kind, ProviderKind::LlamaCloud);
        assert_eq!(kind.to_string(), "llamacloud");
    }
}
