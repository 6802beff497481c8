//! Journal configuration.
//!
//! A [`Config`] says where the database lives, whether writes are allowed,
//! which built-in extensions to load and the initial blacklist. It can be
//! built in code or read from TOML:
//!
//! ```toml
//! database_path = "/var/lib/tempora/activity.sqlite"
//! access_mode = "read_write"
//! default_extensions = true
//! data_sources_path = "/var/lib/tempora/data-sources.json"
//! get_chunk_size = 500
//!
//! [[blacklist]]
//! actor = "application://secret.desktop"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempora_core::{Error, EventTemplate, Result};

/// Controls whether the journal accepts writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Allow both reads and writes (default).
    #[default]
    ReadWrite,
    /// Inserts, deletes and storage-state changes fail with a validation error.
    ReadOnly,
}

/// Default number of ids per `IN (...)` batch when loading events.
pub const DEFAULT_GET_CHUNK_SIZE: usize = 500;

/// Options for opening a [`Journal`](crate::Journal).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file; `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    /// Access mode.
    pub access_mode: AccessMode,
    /// Load the blacklist, storage-monitor and data-source registry
    /// extensions on open.
    pub default_extensions: bool,
    /// Templates the blacklist starts with.
    pub blacklist: Vec<EventTemplate>,
    /// File the data-source registry persists to; `None` keeps it in memory.
    pub data_sources_path: Option<PathBuf>,
    /// Ids per batch when loading events.
    pub get_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            access_mode: AccessMode::ReadWrite,
            default_extensions: true,
            blacklist: Vec::new(),
            data_sources_path: None,
            get_chunk_size: DEFAULT_GET_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// In-memory, read-write, default extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the journal in `path`.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the access mode.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Enable or disable the built-in extensions.
    pub fn default_extensions(mut self, enabled: bool) -> Self {
        self.default_extensions = enabled;
        self
    }

    /// Add an initial blacklist template.
    pub fn blacklist(mut self, template: EventTemplate) -> Self {
        self.blacklist.push(template);
        self
    }

    /// Persist the data-source registry in `path`.
    pub fn data_sources_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_sources_path = Some(path.into());
        self
    }

    /// Set the batch size used when loading events.
    pub fn get_chunk_size(mut self, size: usize) -> Self {
        self.get_chunk_size = size;
        self
    }

    /// True if writes are rejected.
    pub fn is_read_only(&self) -> bool {
        self.access_mode == AccessMode::ReadOnly
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.get_chunk_size == 0 {
            return Err(Error::config("get_chunk_size must be positive"));
        }
        for template in &self.blacklist {
            template.compile()?;
        }
        Ok(())
    }
}
