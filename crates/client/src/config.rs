//! Configuration management using gamescout.toml and environment overrides

use std::fs;
use std::path::Path;
use std::time::Duration;

use gamescout_core::ScoutError;
use serde::{Deserialize, Serialize};

use crate::catalog::{FallbackPolicy, RAWG_BASE_URL};
use crate::feeds::DEFAULT_SEARCH_DEBOUNCE;

pub const CONFIG_PATH: &str = "gamescout.toml";

pub const ENV_RAWG_API_KEY: &str = "RAWG_API_KEY";
pub const ENV_FIREBASE_API_KEY: &str = "FIREBASE_API_KEY";
pub const ENV_FIREBASE_PROJECT_ID: &str = "FIREBASE_PROJECT_ID";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub firebase: FirebaseConfig,

    #[serde(default)]
    pub feeds: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,

    /// RAWG API key; empty means requests go out without one
    pub api_key: String,

    pub page_size: u32,

    pub timeout_secs: u64,

    /// Which operations answer from mock data when the catalog fails
    pub fallback: FallbackPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: RAWG_BASE_URL.to_string(),
            api_key: String::new(),
            page_size: gamescout_core::DEFAULT_PAGE_SIZE,
            timeout_secs: 10,
            fallback: FallbackPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub search_debounce_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl FeedConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Config {
    /// Load `gamescout.toml` from the working directory, then apply
    /// environment overrides. Problems with the file are logged and the
    /// defaults are used instead.
    pub fn load() -> Self {
        let mut config = if Path::new(CONFIG_PATH).exists() {
            match Self::load_from(CONFIG_PATH) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("{}; using defaults", e);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());

        if !config.has_catalog_key() {
            tracing::warn!(
                "{} not set - catalog requests may fail and fall back to mock data",
                ENV_RAWG_API_KEY
            );
        }
        config
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ScoutError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ScoutError::Config(format!("reading {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| ScoutError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ScoutError> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ScoutError::Config(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| ScoutError::Config(format!("writing {}: {}", path.display(), e)))
    }

    /// Non-empty variables replace the corresponding file settings
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = lookup(ENV_RAWG_API_KEY) {
            self.catalog.api_key = key;
        }
        if let Some(key) = lookup(ENV_FIREBASE_API_KEY) {
            self.firebase.api_key = key;
        }
        if let Some(project) = lookup(ENV_FIREBASE_PROJECT_ID) {
            self.firebase.project_id = project;
        }
    }

    pub fn has_catalog_key(&self) -> bool {
        !self.catalog.api_key.trim().is_empty()
    }

    /// Account features need both the Firebase API key and project id
    pub fn has_firebase(&self) -> bool {
        !self.firebase.api_key.trim().is_empty() && !self.firebase.project_id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [catalog]
            api_key = "abc"
            fallback = "all"
            "#,
        )
        .expect("parse");
        assert_eq!(config.catalog.api_key, "abc");
        assert_eq!(config.catalog.fallback, FallbackPolicy::All);
        assert_eq!(config.catalog.base_url, RAWG_BASE_URL);
        assert_eq!(config.catalog.page_size, 20);
        assert_eq!(config.feeds.search_debounce_ms, 300);
        assert_eq!(config.feeds.search_debounce(), Duration::from_millis(300));
        assert!(!config.has_firebase());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_RAWG_API_KEY, "from-env"),
            (ENV_FIREBASE_API_KEY, "fb-key"),
            (ENV_FIREBASE_PROJECT_ID, "  "),
        ]);
        let mut config = Config::default();
        config.firebase.project_id = "from-file".to_string();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.catalog.api_key, "from-env");
        assert_eq!(config.firebase.api_key, "fb-key");
        assert_eq!(config.firebase.project_id, "from-file");
        assert!(config.has_catalog_key());
        assert!(config.has_firebase());
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("gamescout-config-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.catalog.timeout_secs = 3;
        config.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load_from("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ScoutError::Config(_)));
    }
}
