//! Cache configuration file handling
//!
//! Loads and saves ~/.config/graphcache/config.yaml.

use crate::graph::{RecordId, ROOT_MUTATION, ROOT_QUERY};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_root_ids() -> Vec<String> {
    vec![ROOT_QUERY.to_string(), ROOT_MUTATION.to_string()]
}

fn default_true() -> bool {
    true
}

fn default_result_cache_max_size() -> usize {
    10_000
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Ids that are always reachable
    #[serde(default = "default_root_ids")]
    pub root_ids: Vec<String>,

    /// Share structurally equal result objects
    #[serde(default = "default_true")]
    pub canonize_results: bool,

    /// Maximum number of memoized result trees
    #[serde(default = "default_result_cache_max_size")]
    pub result_cache_max_size: usize,

    /// Store `__typename` on every record written from an object
    #[serde(default = "default_true")]
    pub add_typename: bool,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self {
            root_ids: default_root_ids(),
            canonize_results: true,
            result_cache_max_size: default_result_cache_max_size(),
            add_typename: true,
        }
    }

    /// Root ids as typed ids
    pub fn root_record_ids(&self) -> Vec<RecordId> {
        self.root_ids.iter().map(RecordId::new).collect()
    }

    /// Load configuration from the default path (~/.config/graphcache/config.yaml)
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::CacheError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading cache configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            roots = config.root_ids.len(),
            canonize = config.canonize_results,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving cache configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/graphcache/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("graphcache");
        path.push("config.yaml");
        path
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
