//! Configuration for the roster sync
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/darci-sync/config.toml, or `--config <path>`)
//! 3. Built-in defaults (lowest priority)
//!
//! Environment variables use the names of the bot's `.env` file
//! (`GOOGLE_SHEET_ID`, `DCLI_DATA_DIR`, `BUNGIE_API_KEY`, ...).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod dcli;
mod observability;
mod serialization;
mod sheet;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use dcli::{DcliConfig, FileDcli};
pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use sheet::{FileSheet, GoogleCredentialEnv, SheetConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment lookup used while resolving configuration.
///
/// Production passes `std::env::var`; tests pass a map.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Errors raised while loading the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine config path (no home directory)")]
    NoConfigPath,

    #[error("config file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("cannot write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Google Sheet holding the roster (column A)
    pub sheet: SheetConfig,

    /// The dclisync tool and its data directory
    pub dcli: DcliConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    /// Optional [sheet] section
    pub sheet: Option<FileSheet>,

    /// Optional [dcli] section
    pub dcli: Option<FileDcli>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the default config file path: ~/.config/darci-sync/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("darci-sync").join("config.toml"))
    }

    /// Load configuration from the process environment and config file.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => Self::read_file_config(path, true)?,
            None => match Self::config_path() {
                Some(path) => Self::read_file_config(&path, false)?,
                None => FileConfig::default(),
            },
        };

        let env = |key: &str| std::env::var(key).ok();
        Ok(Self::from_sources(file, &env))
    }

    /// Read and parse a config file.
    ///
    /// A missing file yields defaults unless `required` is set. A file that
    /// exists but does not parse is always an error: a broken config should
    /// fail fast, not silently fall back to defaults.
    pub(crate) fn read_file_config(path: &Path, required: bool) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(FileConfig::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Resolve configuration: env > file > defaults
    pub(crate) fn from_sources(file: FileConfig, env: EnvLookup<'_>) -> Self {
        // Blank variables count as unset
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        Self {
            sheet: SheetConfig::from_file(file.sheet, &env),
            dcli: DcliConfig::from_file(file.dcli, &env),
            logging: LoggingConfig::from_file(file.logging),
        }
    }

    /// Names of required settings that are missing.
    ///
    /// Service account fields are not required when a credentials file is
    /// configured.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if !self.sheet.is_configured() {
            missing.push("GOOGLE_SHEET_ID");
        }
        if self.sheet.credentials_file.is_none() {
            missing.extend(self.sheet.credentials.missing());
        }
        if self.dcli.api_key.is_none() {
            missing.push("BUNGIE_API_KEY");
        }

        missing
    }

    /// Write the default config template, refusing to clobber an existing file
    pub fn write_template(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, Self::default().to_toml()).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
