//! Application configuration management.
//!
//! Configuration is stored at `~/.config/pinitdown/config.json`. Every field
//! has a default, so a missing or partial file is fine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::map::LatLng;
use crate::offline::{DEFAULT_CACHE_NAME, DEFAULT_THIRD_PARTY_ASSETS, DEFAULT_THIRD_PARTY_HOSTS};
use crate::store::DEFAULT_STORAGE_KEY;

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "pinitdown";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the configured location, as `"lat,lng"`
pub const LOCATION_ENV: &str = "PINITDOWN_LOCATION";

/// Tomsk
const DEFAULT_CENTER: LatLng = LatLng::new(56.4884, 84.948);
const DEFAULT_ZOOM: u8 = 13;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL the app shell is served from; relative manifest paths resolve against it.
    pub app_origin: String,
    /// Name of the current cache generation. Bump it to roll out a new asset set.
    pub cache_name: String,
    /// Hosts served cache-first and written back at runtime.
    pub third_party_hosts: Vec<String>,
    /// Absolute third-party URLs pinned at install time.
    pub third_party_assets: Vec<String>,
    pub storage_key: String,
    pub default_center: LatLng,
    pub default_zoom: u8,
    /// The user's location, when known.
    pub location: Option<LatLng>,
    /// Skip the network entirely when installing or fetching assets.
    pub offline_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_origin: "http://localhost:8080/".to_string(),
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            third_party_hosts: DEFAULT_THIRD_PARTY_HOSTS.iter().map(|h| h.to_string()).collect(),
            third_party_assets: DEFAULT_THIRD_PARTY_ASSETS.iter().map(|u| u.to_string()).collect(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            location: None,
            offline_mode: false,
        }
    }
}

impl Config {
    /// Load the config, writing the defaults out on first run so there is a
    /// file to edit.
    pub fn load_or_init() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            return Self::load_from(&path);
        }
        let config = Self::default();
        config.save_to(&path)?;
        info!(path = %path.display(), "Wrote default config");
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the note collection lives.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Where cache generations and logs live.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// The user's location: `PINITDOWN_LOCATION` if set and valid, else the
    /// configured one.
    pub fn resolve_location(&self) -> Option<LatLng> {
        match std::env::var(LOCATION_ENV) {
            Ok(raw) => match raw.parse::<LatLng>() {
                Ok(at) => Some(at),
                Err(e) => {
                    warn!(error = %e, "Ignoring {}", LOCATION_ENV);
                    self.location
                }
            },
            Err(_) => self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"cache_name":"pinitdown-v2"}"#).unwrap();
        assert_eq!(config.cache_name, "pinitdown-v2");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.default_zoom, DEFAULT_ZOOM);
        assert_eq!(config.third_party_hosts.len(), 2);
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.location = Some(LatLng::new(1.0, 2.0));
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.location, config.location);
        assert_eq!(back.app_origin, config.app_origin);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.cache_name, DEFAULT_CACHE_NAME);
    }

    #[test]
    fn test_save_then_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(APP_NAME).join(CONFIG_FILE);

        let mut config = Config::default();
        config.cache_name = "pinitdown-v9".to_string();
        config.offline_mode = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.cache_name, "pinitdown-v9");
        assert!(loaded.offline_mode);
    }
}
