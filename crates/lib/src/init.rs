//! Initialize the configuration directory: create ~/.chatlog, a default config, and the data directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config;

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Creates the file store's data directory (from the config, or `data` next to it).
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let (config, _) = config::load_config(Some(config_path.to_path_buf()))?;
    let data_dir = config::resolve_store_dir(&config, config_path);
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        log::info!("created data directory at {}", data_dir.display());
    } else {
        log::debug!("data directory already exists at {}, skipping", data_dir.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_config_and_data_dir() {
        let dir = std::env::temp_dir().join(format!("chatlog-init-{}", uuid::Uuid::new_v4()));
        let config_path = dir.join("config.json");
        let out = init_config_dir(&config_path).unwrap();
        assert_eq!(out, dir);
        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "{}");
        assert!(dir.join("data").is_dir());

        // Second run keeps an edited config.
        std::fs::write(&config_path, r#"{"store":{"directory":"archive"}}"#).unwrap();
        init_config_dir(&config_path).unwrap();
        assert!(dir.join("archive").is_dir());
        assert!(std::fs::read_to_string(&config_path).unwrap().contains("archive"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
