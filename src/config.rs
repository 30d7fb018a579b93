// Store options and the optional YAML configuration file

use crate::backend::{Backend, BlobBackend, ObjectStoreBackend};
use crate::error::ValidationError;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// How `load` treats records that fail validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Drop the record and log an error
    #[default]
    Strict,
    /// Keep the record as stored if it still decodes, logging a warning
    Lenient,
}

/// Feature switches for a `TaskStore` instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub strictness: Strictness,
    pub tags_enabled: bool,
    pub importance_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Strict,
            tags_enabled: true,
            importance_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Blob,
    ObjectStore,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Blob => "blob",
            BackendKind::ObjectStore => "object-store",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(BackendKind::Blob),
            "object-store" => Ok(BackendKind::ObjectStore),
            other => Err(ValidationError::new(format!(
                "Unknown backend: {:?} (expected blob|object-store)",
                other
            ))),
        }
    }
}

/// Contents of `config.yml`
///
/// ```yaml
/// store_dir: ~/tasks
/// backend: object-store
/// store:
///   strictness: lenient
///   tags_enabled: true
///   importance_enabled: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_dir: Option<PathBuf>,
    pub backend: BackendKind,
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(file = ?path, ?config, "Loaded config");
        Ok(config)
    }

    /// Load an explicit file, or the default location if it exists, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Config::default()),
        }
    }

    /// `{config_dir}/taskflow/config.yml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskflow").join("config.yml"))
    }

    /// Configured store directory, else `{data_dir}/taskflow`
    pub fn resolve_store_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.store_dir {
            return Ok(expand_home(dir));
        }
        dirs::data_dir()
            .map(|dir| dir.join("taskflow"))
            .ok_or_else(|| eyre!("Could not determine a data directory; set store_dir or pass --store-path"))
    }

    /// Open the configured backend in `dir`
    pub fn open_backend(&self, dir: &Path) -> Result<Box<dyn Backend>> {
        let backend: Box<dyn Backend> = match self.backend {
            BackendKind::Blob => Box::new(BlobBackend::open(dir).context("Failed to open blob store")?),
            BackendKind::ObjectStore => {
                Box::new(ObjectStoreBackend::open(dir).context("Failed to open object store")?)
            }
        };
        Ok(backend)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
