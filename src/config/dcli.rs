//! dclisync tool configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::EnvLookup;
use crate::secret::ApiKey;

/// How to reach the dclisync tool and its SQLite store
#[derive(Debug, Clone)]
pub struct DcliConfig {
    /// Executable name or path
    pub binary: String,
    /// Data directory passed as `--data-dir`; also holds the database
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub database: String,
    /// Bungie API key (env only, never persisted)
    pub api_key: Option<ApiKey>,
    /// Timeout for `--list`
    pub list_timeout_secs: u64,
    /// Timeout for `--add`; registration talks to Bungie, so it gets longer
    pub add_timeout_secs: u64,
    /// Pause between consecutive `--add` calls
    pub add_delay_secs: u64,
}

impl Default for DcliConfig {
    fn default() -> Self {
        Self {
            binary: "dclisync".to_string(),
            data_dir: PathBuf::from("/data/"),
            database: "dcli.sqlite3".to_string(),
            api_key: None,
            list_timeout_secs: 30,
            add_timeout_secs: 60,
            add_delay_secs: 2,
        }
    }
}

/// dclisync settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileDcli {
    pub binary: Option<String>,
    pub data_dir: Option<String>,
    pub database: Option<String>,
    pub list_timeout_secs: Option<u64>,
    pub add_timeout_secs: Option<u64>,
    pub add_delay_secs: Option<u64>,
}

impl DcliConfig {
    /// Create from file config with env overrides and defaults
    pub fn from_file(file: Option<FileDcli>, env: EnvLookup<'_>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            binary: env("DCLI_BIN").or(file.binary).unwrap_or(defaults.binary),
            data_dir: env("DCLI_DATA_DIR")
                .or(file.data_dir)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            database: file.database.unwrap_or(defaults.database),
            api_key: env("BUNGIE_API_KEY").map(ApiKey::new),
            list_timeout_secs: file.list_timeout_secs.unwrap_or(defaults.list_timeout_secs),
            add_timeout_secs: file.add_timeout_secs.unwrap_or(defaults.add_timeout_secs),
            add_delay_secs: file.add_delay_secs.unwrap_or(defaults.add_delay_secs),
        }
    }

    /// Full path to the member database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn add_timeout(&self) -> Duration {
        Duration::from_secs(self.add_timeout_secs)
    }

    pub fn add_delay(&self) -> Duration {
        Duration::from_secs(self.add_delay_secs)
    }
}
