//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.chatlog/config.json`) and environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Where and how messages are persisted.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Bind, port and the Events API request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Path Slack POSTs events to (default "/slack/events").
    #[serde(default = "default_events_path")]
    pub events_path: String,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_events_path() -> String {
    "/slack/events".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            events_path: default_events_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Keep messages in memory only.
    Memory,
    /// One JSON file per collection under `store.directory`.
    #[default]
    File,
    /// Forward to a persistence service at `store.url`.
    Http,
}

/// Conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Logical collection messages are written to (default "conversations").
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Data directory for the file backend. Relative paths are resolved against the config file's parent. Default: `data` next to the config file.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Base URL of the persistence service (http backend). Overridden by CHATLOG_STORE_URL env.
    #[serde(default)]
    pub url: Option<String>,

    /// Bearer token for the persistence service. Overridden by CHATLOG_STORE_TOKEN env.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_collection() -> String {
    "conversations".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            collection: default_collection(),
            directory: None,
            url: None,
            token: None,
        }
    }
}

/// Non-empty trimmed env value, else the non-empty trimmed config value.
fn env_or_config(env_key: &str, configured: Option<&String>) -> Option<String> {
    std::env::var(env_key)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the persistence service URL: env CHATLOG_STORE_URL overrides config.
pub fn resolve_store_url(config: &Config) -> Option<String> {
    env_or_config("CHATLOG_STORE_URL", config.store.url.as_ref())
}

/// Resolve the persistence service token: env CHATLOG_STORE_TOKEN overrides config.
pub fn resolve_store_token(config: &Config) -> Option<String> {
    env_or_config("CHATLOG_STORE_TOKEN", config.store.token.as_ref())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CHATLOG_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".chatlog").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

fn config_parent(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Data directory of the file backend: `store.directory` (relative to the config file's parent) or `data` next to the config file.
pub fn resolve_store_dir(config: &Config, config_path: &Path) -> PathBuf {
    let parent = config_parent(config_path);
    match &config.store.directory {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                parent.join(d)
            }
        }
        _ => parent.join("data"),
    }
}

/// Load config from the given path, CHATLOG_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 15152);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.gateway.events_path, "/slack/events");
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.collection, "conversations");
    }

    #[test]
    fn parses_camel_case_file() {
        let config: Config = serde_json::from_str(
            r#"{"gateway":{"eventsPath":"/hooks/slack"},"store":{"backend":"http","url":"http://db:8080"}}"#,
        )
        .unwrap();
        assert_eq!(config.gateway.events_path, "/hooks/slack");
        assert_eq!(config.gateway.port, 15152);
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.url.as_deref(), Some("http://db:8080"));
        assert_eq!(config.store.collection, "conversations");
    }

    #[test]
    fn empty_object_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.gateway.port, 15152);
    }

    #[test]
    fn store_dir_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.chatlog/config.json");
        assert_eq!(
            resolve_store_dir(&config, path),
            PathBuf::from("/home/user/.chatlog/data")
        );
    }

    #[test]
    fn store_dir_override_relative() {
        let mut config = Config::default();
        config.store.directory = Some(PathBuf::from("archive"));
        let path = Path::new("/home/user/.chatlog/config.json");
        assert_eq!(
            resolve_store_dir(&config, path),
            PathBuf::from("/home/user/.chatlog/archive")
        );
    }

    #[test]
    fn store_dir_override_absolute() {
        let mut config = Config::default();
        config.store.directory = Some(PathBuf::from("/var/lib/chatlog"));
        let path = Path::new("/home/user/.chatlog/config.json");
        assert_eq!(
            resolve_store_dir(&config, path),
            PathBuf::from("/var/lib/chatlog")
        );
    }

    #[test]
    fn blank_config_values_are_ignored() {
        assert_eq!(env_or_config("CHATLOG_TEST_UNSET_KEY", Some(&"  ".to_string())), None);
        assert_eq!(
            env_or_config("CHATLOG_TEST_UNSET_KEY", Some(&" tok ".to_string())),
            Some("tok".to_string())
        );
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir()
            .join(format!("chatlog-missing-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.store.collection, "conversations");
    }
}
