//! Config serialization to TOML
//!
//! Single source of truth for config file format. Secrets (API key, private
//! key) are environment-only and never written here.

use super::Config;

impl Config {
    /// Serialize the optional sheet id, commented out when unset
    fn sheet_id_to_toml(&self) -> String {
        match &self.sheet.id {
            Some(id) => format!("id = {:?}", id),
            None => "# id = \"your-spreadsheet-id\"   # or GOOGLE_SHEET_ID".to_string(),
        }
    }

    /// Serialize the optional credentials file, commented out when unset
    fn credentials_file_to_toml(&self) -> String {
        match &self.sheet.credentials_file {
            Some(path) => format!("credentials_file = {:?}", path.display().to_string()),
            None => {
                "# credentials_file = \"/path/to/service-account.json\"   # or GOOGLE_APPLICATION_CREDENTIALS"
                    .to_string()
            }
        }
    }

    /// Render the full config file
    pub fn to_toml(&self) -> String {
        format!(
            r#"# darci-sync configuration
#
# Environment variables override everything in this file.
# Secrets are read from the environment only:
#   BUNGIE_API_KEY                          - passed to dclisync
#   GOOGLE_PRIVATE_KEY, GOOGLE_CLIENT_EMAIL, ... - service account fields
#     (not needed when credentials_file is set)

# Google Sheet holding the roster; identifiers (name#tag) in the first column
[sheet]
{sheet_id}
range = {range:?}
{credentials_file}
api_base = {api_base:?}
token_uri = {token_uri:?}
timeout_secs = {sheet_timeout}

# dclisync tool and its data directory
[dcli]
binary = {binary:?}
data_dir = {data_dir:?}
database = {database:?}
list_timeout_secs = {list_timeout}
add_timeout_secs = {add_timeout}
# Pause between consecutive registrations (rate-limit guard)
add_delay_secs = {add_delay}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level:?}
# File logging (JSON lines, in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir:?}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix:?}
"#,
            sheet_id = self.sheet_id_to_toml(),
            range = self.sheet.range,
            credentials_file = self.credentials_file_to_toml(),
            api_base = self.sheet.api_base,
            token_uri = self.sheet.token_uri,
            sheet_timeout = self.sheet.timeout_secs,
            binary = self.dcli.binary,
            data_dir = self.dcli.data_dir.display().to_string(),
            database = self.dcli.database,
            list_timeout = self.dcli.list_timeout_secs,
            add_timeout = self.dcli.add_timeout_secs,
            add_delay = self.dcli.add_delay_secs,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display().to_string(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
        )
    }
}
