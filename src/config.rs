//! Store location and optional TOML configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::RetentionPolicy;
use crate::{Error, Result};

/// Path value that selects a non-persistent, in-memory store
pub const IN_MEMORY: &str = ":memory:";

/// Where a store keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorePath {
    /// Non-persistent, dropped with the store
    InMemory,
    /// SQLite database file
    File(PathBuf),
}

impl StorePath {
    /// `~/.agent-memory/memory.db`
    pub fn default_location() -> Result<Self> {
        Ok(StorePath::File(default_database_path()?))
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, StorePath::InMemory)
    }
}

impl From<&str> for StorePath {
    fn from(s: &str) -> Self {
        if s == IN_MEMORY {
            StorePath::InMemory
        } else {
            StorePath::File(PathBuf::from(s))
        }
    }
}

impl From<String> for StorePath {
    fn from(s: String) -> Self {
        StorePath::from(s.as_str())
    }
}

impl From<&Path> for StorePath {
    fn from(path: &Path) -> Self {
        match path.to_str() {
            Some(s) => StorePath::from(s),
            None => StorePath::File(path.to_path_buf()),
        }
    }
}

impl From<PathBuf> for StorePath {
    fn from(path: PathBuf) -> Self {
        StorePath::from(path.as_path())
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorePath::InMemory => write!(f, "{}", IN_MEMORY),
            StorePath::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Contents of `agent-memory.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MemoryConfig {
    pub database: Option<String>,
    pub recall_limit: Option<usize>,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RetentionConfig {
    pub max_age_days: Option<i64>,
    pub min_access_count: Option<u32>,
    pub include_superseded: Option<bool>,
}

impl MemoryConfig {
    /// Configured store, or the default location
    pub fn store_path(&self) -> Result<StorePath> {
        match &self.database {
            Some(db) => Ok(StorePath::from(db.as_str())),
            None => StorePath::default_location(),
        }
    }

    /// Retention policy with unset fields taken from the defaults
    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        let defaults = RetentionPolicy::default();
        Ok(RetentionPolicy {
            max_age: match self.retention.max_age_days {
                Some(days) => retention_age(days)?,
                None => defaults.max_age,
            },
            min_access_count: self.retention.min_access_count.unwrap_or(defaults.min_access_count),
            include_superseded: self
                .retention
                .include_superseded
                .unwrap_or(defaults.include_superseded),
        })
    }
}

/// Convert a retention age in days, rejecting counts chrono cannot represent
pub fn retention_age(days: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_days(days)
        .ok_or_else(|| Error::InvalidInput(format!("max age of {days} days is out of range")))
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("agent-memory.toml")
}

pub fn default_database_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| Error::Config("HOME is not set; pass an explicit database path".to_string()))?;
    Ok(default_database_path_in(&home))
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".agent-memory").join("memory.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MemoryConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MemoryConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MemoryConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
