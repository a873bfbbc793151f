//! Minimal configuration loading for the Kai hub SDK.
//!
//! Kept dependency-light so the SDK and host binaries can both import it.
//!
//! # Usage
//!
//! ```rust,no_run
//! use kaiconf::KaiConfig;
//!
//! let config = KaiConfig::load().expect("Failed to load config");
//! println!("hub: {}", config.hub.endpoint);
//! println!("retry every {:?}", config.hub.retry_policy().delay);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/kai/config.toml` (system)
//! 2. `~/.config/kai/config.toml` (user)
//! 3. `./kai.toml` (local override, or an explicit path)
//! 4. Environment variables (`KAI_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [hub]
//! endpoint = "ws://localhost:2203"
//! retry_delay_ms = 2000
//! max_retries = 30
//! handshake_timeout_ms = 10000
//!
//! [module]
//! id = "my-module"
//! secret = "s3cret"
//!
//! [telemetry]
//! log_level = "debug"
//! ```

pub mod hub;
pub mod loader;

pub use hub::{HubConfig, RetryPolicy, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Module credentials presented to the hub on authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModuleConfig {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub secret: Option<String>,
}

impl ModuleConfig {
    /// Both halves of the credential pair, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.id, &self.secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// Complete SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KaiConfig {
    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub module: ModuleConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl KaiConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with a specific file taking the place of `./kai.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = KaiConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Kai SDK Configuration\n\n");

        output.push_str("[hub]\n");
        output.push_str(&format!("endpoint = {}\n", toml_string(&self.hub.endpoint)));
        output.push_str(&format!("retry_delay_ms = {}\n", self.hub.retry_delay_ms));
        if let Some(max) = self.hub.max_retries {
            output.push_str(&format!("max_retries = {}\n", max));
        }
        if let Some(timeout) = self.hub.handshake_timeout_ms {
            output.push_str(&format!("handshake_timeout_ms = {}\n", timeout));
        }

        // Secrets stay out of rendered config
        output.push_str("\n[module]\n");
        if let Some(id) = &self.module.id {
            output.push_str(&format!("id = {}\n", toml_string(id)));
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = {}\n", toml_string(&self.telemetry.log_level)));

        output
    }
}

/// Quote and escape a string as a TOML basic string.
fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KaiConfig::default();
        assert_eq!(config.hub.endpoint, "ws://localhost:2203");
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.module.credentials().is_none());
    }

    #[test]
    fn test_to_toml_roundtrips_through_loader() {
        let mut config = KaiConfig::default();
        config.hub.max_retries = Some(4);
        config.module.id = Some("kai-test".to_string());
        config.module.secret = Some("hidden".to_string());

        let rendered = config.to_toml();
        assert!(rendered.contains("[hub]"));
        assert!(rendered.contains("max_retries = 4"));
        assert!(!rendered.contains("hidden"));

        let parsed: KaiConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.hub, config.hub);
        assert_eq!(parsed.module.id.as_deref(), Some("kai-test"));
        assert_eq!(parsed.module.secret, None);
    }

    #[test]
    fn test_to_toml_escapes_quotes() {
        let mut config = KaiConfig::default();
        config.module.id = Some(r#"my "quoted" \ module"#.to_string());

        let parsed: KaiConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.module.id, config.module.id);
    }

    #[test]
    fn test_credentials_need_both_halves() {
        let module = ModuleConfig {
            id: Some("m".to_string()),
            secret: None,
        };
        assert!(module.credentials().is_none());

        let module = ModuleConfig {
            id: Some("m".to_string()),
            secret: Some("s".to_string()),
        };
        assert_eq!(module.credentials(), Some(("m", "s")));
    }
}
