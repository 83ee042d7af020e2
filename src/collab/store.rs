//! Named configuration presets

use crate::model::MigrationConfiguration;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no configuration preset named '{0}'")]
    NotFound(String),

    #[error("invalid preset name '{0}': use letters, digits, '-' or '_'")]
    InvalidName(String),

    #[error("failed to access preset '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("preset '{name}' is malformed: {message}")]
    Malformed { name: String, message: String },
}

/// Loads and saves named [`MigrationConfiguration`] presets
///
/// Consulted when jobs are submitted, never while they run.
pub trait ConfigurationStore: Send + Sync {
    fn load(&self, name: &str) -> Result<MigrationConfiguration, StoreError>;
    fn save(&self, name: &str, configuration: &MigrationConfiguration) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

fn check_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// One TOML file per preset in a directory
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", name))
    }
}

impl ConfigurationStore for FileConfigStore {
    fn load(&self, name: &str) -> Result<MigrationConfiguration, StoreError> {
        check_name(name)?;
        let path = self.path_for(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(source) => {
                return Err(StoreError::Io {
                    name: name.to_string(),
                    source,
                })
            }
        };

        debug!(preset = name, path = %path.display(), "Loaded configuration preset");
        toml::from_str(&content).map_err(|e| StoreError::Malformed {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    fn save(&self, name: &str, configuration: &MigrationConfiguration) -> Result<(), StoreError> {
        check_name(name)?;
        let content = toml::to_string_pretty(configuration).map_err(|e| StoreError::Malformed {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let io_err = |source| StoreError::Io {
            name: name.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        fs::write(self.path_for(name), content).map_err(io_err)?;
        debug!(preset = name, dir = %self.dir.display(), "Saved configuration preset");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    name: self.dir.display().to_string(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("toml"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .filter(|name| check_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }
}

/// In-process preset store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    presets: Mutex<BTreeMap<String, MigrationConfiguration>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn presets(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MigrationConfiguration>> {
        self.presets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConfigurationStore for MemoryConfigStore {
    fn load(&self, name: &str) -> Result<MigrationConfiguration, StoreError> {
        self.presets()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn save(&self, name: &str, configuration: &MigrationConfiguration) -> Result<(), StoreError> {
        check_name(name)?;
        self.presets()
            .insert(name.to_string(), configuration.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.presets().keys().cloned().collect())
    }
}
