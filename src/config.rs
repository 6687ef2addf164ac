//! Application configuration, read from `config.toml`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::FileStore;

const APP_DIR: &str = "studyquiz";
const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cannot write config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Defaults for quizzes started from the CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuizDefaults {
    /// Shuffle question order in mega quizzes
    pub mega_shuffle: bool,
    pub mega_question_limit: Option<usize>,
    /// Questions kept from a generated payload
    pub generated_question_count: usize,
}

impl Default for QuizDefaults {
    fn default() -> Self {
        Self {
            mega_shuffle: true,
            mega_question_limit: None,
            generated_question_count: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    /// Signed-in user. Without one, reads are empty and writes are rejected.
    pub user: Option<Uuid>,
    /// Default log filter, e.g. "info" or "studyquiz_lib=debug"
    pub log_level: Option<String>,
    pub quiz: QuizDefaults,
}

impl AppConfig {
    /// Location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location; a missing file gives defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Configured data directory, falling back to the platform default
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(FileStore::default_data_dir)
    }
}
