//! Application configuration for formscribe.
//!
//! User config lives at `~/.formscribe/formscribe.toml`.
//! CLI flags override config file values, which override defaults.
//! The loaded value is immutable and handed to components at construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FormscribeError, Result};
use crate::registry::{PlatformConfig, PlatformRegistry};
use crate::types::{PlatformId, ResponseFormat};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "formscribe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".formscribe";

// ---------------------------------------------------------------------------
// Config structs (matching formscribe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation endpoint settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Per-platform field table overrides. A platform listed here replaces
    /// its built-in table entirely.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<PlatformId, PlatformConfig>,
}

impl AppConfig {
    /// Built-in field tables merged with the overrides from this config.
    pub fn registry(&self) -> Result<PlatformRegistry> {
        PlatformRegistry::with_overrides(&self.platforms)
    }

    /// Check the endpoint URL, timeout, and any selector overrides.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.registry().map(|_| ())
    }
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint receiving `POST { "prompt": ... }`.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Extra request headers.
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// Dot path to the generated content inside the response body.
    #[serde(default = "default_response_path")]
    pub response_path: String,

    /// Shape the endpoint is asked to answer in.
    #[serde(default)]
    pub expected_format: ResponseFormat,

    /// Maximum wait for a response, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            headers: default_headers(),
            response_path: default_response_path(),
            expected_format: ResponseFormat::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.url).map_err(|e| {
            FormscribeError::config(format!("invalid api.url {:?}: {e}", self.url))
        })?;
        if self.timeout_ms == 0 {
            return Err(FormscribeError::config("api.timeout_ms must be greater than 0"));
        }
        Ok(())
    }
}

fn default_api_url() -> String {
    "https://your-ai-api-endpoint.com/generate".into()
}
fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}
fn default_response_path() -> String {
    "response.answer".into()
}
fn default_timeout_ms() -> u64 {
    30_000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.formscribe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FormscribeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.formscribe/formscribe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FormscribeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FormscribeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FormscribeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FormscribeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FormscribeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldName;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("response_path"));
        assert!(toml_str.contains("timeout_ms = 30000"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.api.response_path, "response.answer");
        assert_eq!(parsed.api.expected_format, ResponseFormat::Json);
        assert_eq!(parsed.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn config_with_platform_override() {
        let toml_str = r##"
[api]
url = "http://localhost:8080/generate"
expected_format = "text"
timeout_ms = 500

[platforms.CLARITY.fields.DESCRIPTION]
id = "notes"
label = "Notes"
selectors = ["#notes", "textarea[name=notes]"]
"##;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.api.expected_format, ResponseFormat::Text);

        let registry = config.registry().unwrap();
        let clarity = registry.get(PlatformId::Clarity).unwrap();
        assert_eq!(clarity.platform(), PlatformId::Clarity);
        let desc = clarity.field(FieldName::Description).unwrap();
        assert_eq!(desc.selectors, vec!["#notes", "textarea[name=notes]"]);
        assert!(registry
            .get(PlatformId::Jira)
            .unwrap()
            .field(FieldName::TestCases)
            .is_some());
    }

    #[test]
    fn invalid_url_and_zero_timeout_rejected() {
        let mut api = ApiConfig {
            url: "not a url".into(),
            ..Default::default()
        };
        assert!(api.validate().is_err());

        api.url = "https://example.com/generate".into();
        api.timeout_ms = 0;
        let err = api.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/formscribe.toml")).unwrap_err();
        assert!(matches!(err, FormscribeError::Io { .. }));
    }
}
