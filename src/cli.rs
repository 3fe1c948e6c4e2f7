// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - sync (default): run one sync pass
// - check: dependency diagnostics
// - lookup <name#tag>: is this member in the store
// - config --show | --path | --init: configuration management

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigError, VERSION};
use crate::store::{MemberDirectory, SqliteMemberDirectory};

/// darci-sync - Google Sheet to dclisync roster sync
#[derive(Parser, Debug)]
#[command(name = "darci-sync")]
#[command(version = VERSION)]
#[command(about = "Sync clan members from a Google Sheet into dclisync", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/darci-sync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run one sync pass (default)
    Sync {
        /// Report new users without adding them
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check configuration, member store, sheet access and dclisync
    Check,

    /// Look up a member in the store by name#tag (case-insensitive)
    Lookup {
        /// Bungie name, e.g. Guardian#1234
        name: String,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration (secrets masked)
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write the default config file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

impl Cli {
    /// Subcommand to run; plain `darci-sync` means `sync`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Sync {
            dry_run: false,
            json: false,
        })
    }
}

/// Resolve the config file path: `--config` or the default location
fn target_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path().ok_or(ConfigError::NoConfigPath),
    }
}

/// `config --path` and `config --init` work without loading the file, so a
/// broken config can still be located and replaced.
pub fn handle_config_file(
    explicit: Option<&Path>,
    path: bool,
    init: bool,
    force: bool,
) -> Result<bool> {
    if path {
        println!("{}", target_path(explicit)?.display());
        return Ok(true);
    }
    if init {
        let target = target_path(explicit)?;
        Config::write_template(&target, force)?;
        println!("Config written: {}", target.display());
        return Ok(true);
    }
    Ok(false)
}

pub fn handle_config_show(config: &Config, explicit: Option<&Path>) {
    for line in config_lines(config, explicit) {
        println!("{}", line);
    }
}

/// Effective configuration as TOML-ish lines; secrets are masked
fn config_lines(config: &Config, explicit: Option<&Path>) -> Vec<String> {
    let sheet = &config.sheet;
    let dcli = &config.dcli;
    let logging = &config.logging;
    let mut out = Vec::new();

    out.push("# Effective configuration (env > file > defaults)".to_string());
    out.push(String::new());
    out.push("[sheet]".to_string());
    out.push(match &sheet.id {
        Some(id) => format!("id = {:?}", id),
        None => "# id not set (sync will be skipped)".to_string(),
    });
    out.push(format!("range = {:?}", sheet.range));
    match &sheet.credentials_file {
        Some(path) => out.push(format!(
            "credentials_file = {:?}",
            path.display().to_string()
        )),
        None => {
            let missing = sheet.credentials.missing();
            if missing.is_empty() {
                out.push("# credentials: service account from environment".to_string());
            } else {
                out.push(format!("# credentials: missing {}", missing.join(", ")));
            }
        }
    }
    if let Some(email) = &sheet.credentials.client_email {
        out.push(format!("# client_email = {:?}", email));
    }
    if let Some(url) = &sheet.credentials.client_cert_url {
        out.push(format!("# client_cert_url = {:?}", url));
    }
    out.push(format!("api_base = {:?}", sheet.api_base));
    out.push(format!("token_uri = {:?}", sheet.token_uri));
    out.push(format!("timeout_secs = {}", sheet.timeout_secs));
    out.push(String::new());
    out.push("[dcli]".to_string());
    out.push(format!("binary = {:?}", dcli.binary));
    out.push(format!("data_dir = {:?}", dcli.data_dir.display().to_string()));
    out.push(format!("database = {:?}", dcli.database));
    out.push(format!("list_timeout_secs = {}", dcli.list_timeout_secs));
    out.push(format!("add_timeout_secs = {}", dcli.add_timeout_secs));
    out.push(format!("add_delay_secs = {}", dcli.add_delay_secs));
    out.push(match &dcli.api_key {
        Some(key) => format!("# api_key = {} (sha256 {})", key, key.fingerprint()),
        None => "# api_key not set (BUNGIE_API_KEY)".to_string(),
    });
    out.push(String::new());
    out.push("[logging]".to_string());
    out.push(format!("level = {:?}", logging.level));
    out.push(format!("file_enabled = {}", logging.file_enabled));
    out.push(format!("file_dir = {:?}", logging.file_dir.display().to_string()));
    out.push(format!("file_rotation = {:?}", logging.file_rotation.as_str()));
    out.push(format!("file_prefix = {:?}", logging.file_prefix));
    out.push(String::new());
    out.push(match target_path(explicit) {
        Ok(path) if path.exists() => format!("# Source: {}", path.display()),
        _ => "# Source: defaults (no config file)".to_string(),
    });
    out
}

/// Print the stored display name; errors when the member is not registered
pub fn handle_lookup(store: &dyn MemberDirectory, name: &str) -> Result<()> {
    match store.find_member(name)? {
        Some(member) => {
            println!("{}", member.display_name);
            Ok(())
        }
        None => bail!("{} is not registered", name.trim()),
    }
}

/// Store for `lookup`, at the configured data directory
pub fn member_store(config: &Config) -> SqliteMemberDirectory {
    SqliteMemberDirectory::new(config.dcli.db_path())
}
