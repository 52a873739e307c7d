//! Service configuration.
//!
//! Loaded from a TOML file; every field has a default so a partial file is
//! enough.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::search::DEFAULT_MODEL;

/// Default number of records returned when a request omits `top_k`.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound applied to caller-supplied `top_k`.
pub const DEFAULT_MAX_TOP_K: usize = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api: ApiConfig,
    pub query: QueryConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub store: StoreConfig,
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Socket address to bind
    pub listen_address: String,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed origins (empty = any)
    pub cors_origins: Vec<String>,
    /// Per-request deadline for the query pipeline
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:5000".to_string(),
            cors_enabled: false,
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Query defaults and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name
    pub model: String,
    /// Where model files are cached on disk
    pub cache_dir: Option<PathBuf>,
    /// Number of prompt embeddings kept in memory (0 disables the cache)
    pub cache_capacity: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            cache_dir: None,
            cache_capacity: 1024,
        }
    }
}

/// Vector index backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Flat,
    Qdrant,
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    /// Flat index file
    pub path: PathBuf,
    pub qdrant_url: String,
    pub collection: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Flat,
            path: PathBuf::from("vector_index.json"),
            qdrant_url: "http://localhost:6334".to_string(),
            collection: None,
        }
    }
}

/// Record store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Rocksdb,
    Json,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// RocksDB directory or JSON file
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Rocksdb,
            path: PathBuf::from("data_storage"),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.query.default_top_k == 0 {
            return Err(Error::Config("query.default_top_k must be positive".into()));
        }
        if self.query.max_top_k < self.query.default_top_k {
            return Err(Error::Config(format!(
                "query.max_top_k ({}) is smaller than query.default_top_k ({})",
                self.query.max_top_k, self.query.default_top_k
            )));
        }
        self.listen_addr()?;
        if self.index.backend == IndexBackend::Qdrant && self.index.collection.is_none() {
            return Err(Error::Config(
                "index.collection is required for the qdrant backend".into(),
            ));
        }
        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.api.listen_address.parse().map_err(|e| {
            Error::Config(format!(
                "invalid api.listen_address '{}': {}",
                self.api.listen_address, e
            ))
        })
    }
}
