//! Runtime configuration read from the environment at launch.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".school-manager";
/// Data directory used in development, relative to the working directory.
const DEV_DATA_DIR: &str = "data";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "school.sqlite";
const LOG_DIR_NAME: &str = "logs";

pub const ENV_MODE: &str = "SCHOOL_MANAGER_ENV";
pub const ENV_DB_PATH: &str = "SCHOOL_MANAGER_DB";
pub const ENV_LOG_FILTER: &str = "SCHOOL_MANAGER_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Development,
    Production,
}

impl AppMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppMode::Development),
            "production" | "prod" | "" => Ok(AppMode::Production),
            other => bail!("unknown {ENV_MODE} value {other:?}; expected development or production"),
        }
    }

    pub fn default_log_filter(self) -> &'static str {
        match self {
            AppMode::Development => "debug",
            AppMode::Production => "info",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: AppMode,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self::from_lookup(|key| env::var(key).ok(), home)
    }

    /// Build the configuration from any variable source. `home` is only
    /// consulted in production mode.
    pub fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup(ENV_MODE) {
            Some(raw) => AppMode::parse(&raw)?,
            None => AppMode::Production,
        };

        let data_dir = match mode {
            AppMode::Development => PathBuf::from(DEV_DATA_DIR),
            AppMode::Production => home
                .ok_or_else(|| anyhow!("could not locate home directory"))?
                .join(DATA_DIR_NAME),
        };

        let db_path = lookup(ENV_DB_PATH)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DB_FILE_NAME));

        let log_filter = lookup(ENV_LOG_FILTER)
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| mode.default_log_filter().to_string());

        Ok(Self {
            mode,
            db_path,
            log_dir: data_dir.join(LOG_DIR_NAME),
            log_filter,
        })
    }
}
