use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{SectorScopeError, dominance::DEFAULT_RESOLUTION, storage::FileSessionStore};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "sectorscope";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the pre-processed artifact tree
    pub data_dir: Option<PathBuf>,
    /// Mini-sectors per dominance map
    pub resolution: usize,
    /// Season used when a command does not name one
    pub default_year: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            resolution: DEFAULT_RESOLUTION,
            default_year: 2024,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf, SectorScopeError> {
        Ok(dirs::config_dir()
            .ok_or(SectorScopeError::NoDataDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Read the user configuration, `None` when it was never saved.
    pub fn from_local_file() -> Result<Option<Self>, SectorScopeError> {
        Self::from_file(&Self::config_path()?)
    }

    pub fn from_file(config_path: &Path) -> Result<Option<Self>, SectorScopeError> {
        if !config_path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(config_path)
            .map_err(|e| SectorScopeError::ConfigIO { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| SectorScopeError::ConfigSerialize { source: e })
    }

    pub fn save(&self) -> Result<(), SectorScopeError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), SectorScopeError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SectorScopeError::ConfigIO { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| SectorScopeError::ConfigIO { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| SectorScopeError::ConfigSerialize { source: e })
    }

    /// Artifact directory, falling back to the platform data directory.
    pub fn data_dir(&self) -> Result<PathBuf, SectorScopeError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => FileSessionStore::default_storage_path(),
        }
    }
}
