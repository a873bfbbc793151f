//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, HubConfig, KaiConfig, TelemetryConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with an explicit override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli), existing files only.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/kai/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("kai/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("kai.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<KaiConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string. Missing sections fall back to defaults.
fn parse_toml(contents: &str, path: &Path) -> Result<KaiConfig, ConfigError> {
    toml::from_str(contents).map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge two configs, with `overlay` taking precedence wherever it differs
/// from the compiled default.
pub fn merge_configs(base: KaiConfig, overlay: KaiConfig) -> KaiConfig {
    let hub_default = HubConfig::default();
    let telemetry_default = TelemetryConfig::default();

    KaiConfig {
        hub: HubConfig {
            endpoint: if overlay.hub.endpoint != hub_default.endpoint {
                overlay.hub.endpoint
            } else {
                base.hub.endpoint
            },
            retry_delay_ms: if overlay.hub.retry_delay_ms != hub_default.retry_delay_ms {
                overlay.hub.retry_delay_ms
            } else {
                base.hub.retry_delay_ms
            },
            max_retries: overlay.hub.max_retries.or(base.hub.max_retries),
            handshake_timeout_ms: overlay
                .hub
                .handshake_timeout_ms
                .or(base.hub.handshake_timeout_ms),
        },
        module: crate::ModuleConfig {
            id: overlay.module.id.or(base.module.id),
            secret: overlay.module.secret.or(base.module.secret),
        },
        telemetry: TelemetryConfig {
            log_level: if overlay.telemetry.log_level != telemetry_default.log_level {
                overlay.telemetry.log_level
            } else {
                base.telemetry.log_level
            },
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut KaiConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Overlay driven by an arbitrary lookup so tests don't touch process env.
fn apply_overrides_from<F>(config: &mut KaiConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("KAI_HUB_ENDPOINT") {
        config.hub.endpoint = v;
        sources.env_overrides.push("KAI_HUB_ENDPOINT".to_string());
    }
    if let Some(v) = lookup("KAI_RETRY_DELAY_MS") {
        if let Ok(ms) = v.parse() {
            config.hub.retry_delay_ms = ms;
            sources.env_overrides.push("KAI_RETRY_DELAY_MS".to_string());
        }
    }
    if let Some(v) = lookup("KAI_MAX_RETRIES") {
        if let Ok(max) = v.parse() {
            config.hub.max_retries = Some(max);
            sources.env_overrides.push("KAI_MAX_RETRIES".to_string());
        }
    }
    if let Some(v) = lookup("KAI_HANDSHAKE_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            config.hub.handshake_timeout_ms = Some(ms);
            sources.env_overrides.push("KAI_HANDSHAKE_TIMEOUT_MS".to_string());
        }
    }

    if let Some(v) = lookup("KAI_MODULE_ID") {
        config.module.id = Some(v);
        sources.env_overrides.push("KAI_MODULE_ID".to_string());
    }
    if let Some(v) = lookup("KAI_MODULE_SECRET") {
        config.module.secret = Some(v);
        sources.env_overrides.push("KAI_MODULE_SECRET".to_string());
    }

    if let Some(v) = lookup("KAI_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("KAI_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[hub]
retry_delay_ms = 500
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.hub.retry_delay_ms, 500);
        // Other values should be defaults
        assert_eq!(config.hub.endpoint, "ws://localhost:2203");
        assert_eq!(config.hub.max_retries, None);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[hub]
endpoint = "ws://127.0.0.1:4000"
retry_delay_ms = 250
max_retries = 12
handshake_timeout_ms = 3000

[module]
id = "demo"
secret = "pw"

[telemetry]
log_level = "debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.hub.endpoint, "ws://127.0.0.1:4000");
        assert_eq!(config.hub.retry_delay_ms, 250);
        assert_eq!(config.hub.max_retries, Some(12));
        assert_eq!(config.hub.handshake_timeout_ms, Some(3000));
        assert_eq!(config.module.credentials(), Some(("demo", "pw")));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_toml("[hub\nendpoint = 1", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_merge_overlay_wins_only_when_set() {
        let mut base = KaiConfig::default();
        base.hub.endpoint = "ws://base:1".to_string();
        base.hub.max_retries = Some(2);
        base.module.id = Some("base".to_string());

        let mut overlay = KaiConfig::default();
        overlay.hub.retry_delay_ms = 10;
        overlay.module.secret = Some("overlay".to_string());

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.hub.endpoint, "ws://base:1");
        assert_eq!(merged.hub.retry_delay_ms, 10);
        assert_eq!(merged.hub.max_retries, Some(2));
        assert_eq!(merged.module.credentials(), Some(("base", "overlay")));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KAI_HUB_ENDPOINT", "ws://env:7"),
            ("KAI_MAX_RETRIES", "5"),
            ("KAI_RETRY_DELAY_MS", "not-a-number"),
            ("KAI_MODULE_ID", "env-module"),
        ]
        .into_iter()
        .collect();

        let mut config = KaiConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.hub.endpoint, "ws://env:7");
        assert_eq!(config.hub.max_retries, Some(5));
        // Unparseable values are ignored
        assert_eq!(config.hub.retry_delay_ms, 2000);
        assert_eq!(config.module.id.as_deref(), Some("env-module"));
        assert_eq!(
            sources.env_overrides,
            vec!["KAI_HUB_ENDPOINT", "KAI_MAX_RETRIES", "KAI_MODULE_ID"]
        );
    }

    #[test]
    fn test_explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub]\nendpoint = \"ws://file:9\"").unwrap();

        let files = discover_config_files_with_override(Some(file.path()));
        assert_eq!(files.last().map(PathBuf::as_path), Some(file.path()));

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.hub.endpoint, "ws://file:9");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_from_file(Path::new("/nonexistent/kai.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
