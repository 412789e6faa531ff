use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MnemoConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding the metadata records.
    pub db_path: String,
    /// Base path for the snapshot pair; `.index` and `.map` suffixes are appended.
    pub snapshot_base: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub min_similarity: f32,
    pub list_page_limit: usize,
}

impl Default for MnemoConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_mnemo_dir();
        Self {
            db_path: dir.join("memory.db").to_string_lossy().into_owned(),
            snapshot_base: dir.join("memory").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".into(),
            dimensions: 384,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            min_similarity: 0.0,
            list_page_limit: 50,
        }
    }
}

impl RetrievalConfig {
    /// The configured result count when the CLI left `-k` unset.
    pub fn resolve_k(&self, k: Option<usize>) -> usize {
        k.unwrap_or(self.default_k)
    }

    /// The configured similarity floor when the CLI left it unset.
    pub fn resolve_min_similarity(&self, floor: Option<f32>) -> f32 {
        floor.unwrap_or(self.min_similarity)
    }

    /// The configured page size when the CLI left `--limit` unset.
    pub fn resolve_limit(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.list_page_limit)
    }
}

/// Returns `~/.mnemo/`
pub fn default_mnemo_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".mnemo")
}

/// Returns the default config file path: `~/.mnemo/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mnemo_dir().join("config.toml")
}

impl MnemoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MNEMO_DB, MNEMO_SNAPSHOT, MNEMO_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMO_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MNEMO_SNAPSHOT") {
            self.storage.snapshot_base = val;
        }
        if let Ok(val) = std::env::var("MNEMO_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the snapshot base path, expanding `~` if needed.
    pub fn resolved_snapshot_base(&self) -> PathBuf {
        expand_tilde(&self.storage.snapshot_base)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
