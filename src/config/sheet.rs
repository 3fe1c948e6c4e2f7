//! Google Sheet source configuration

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use super::EnvLookup;
use crate::secret::REDACTED;

pub const DEFAULT_RANGE: &str = "Sheet1!A:A";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Where the roster sheet lives and how to authenticate against it
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Spreadsheet ID; unset means the sync is skipped
    pub id: Option<String>,
    /// A1 range whose first column holds the identifiers
    pub range: String,
    /// Service account JSON key file (takes precedence over the env fields)
    pub credentials_file: Option<PathBuf>,
    /// Service account fields from individual environment variables
    pub credentials: GoogleCredentialEnv,
    /// Sheets API base URL
    pub api_base: String,
    /// OAuth token endpoint
    pub token_uri: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            id: None,
            range: DEFAULT_RANGE.to_string(),
            credentials_file: None,
            credentials: GoogleCredentialEnv::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Sheet settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileSheet {
    pub id: Option<String>,
    pub range: Option<String>,
    pub credentials_file: Option<String>,
    pub api_base: Option<String>,
    pub token_uri: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Service account fields as individual environment variables
#[derive(Clone, Default)]
pub struct GoogleCredentialEnv {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: Option<String>,
    pub client_email: Option<String>,
    pub client_id: Option<String>,
    pub client_cert_url: Option<String>,
}

impl fmt::Debug for GoogleCredentialEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCredentialEnv")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &self.private_key.as_ref().map(|_| REDACTED))
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("client_cert_url", &self.client_cert_url)
            .finish()
    }
}

impl GoogleCredentialEnv {
    fn from_env(env: EnvLookup<'_>) -> Self {
        Self {
            project_id: env("GOOGLE_PROJECT_ID"),
            private_key_id: env("GOOGLE_PRIVATE_KEY_ID"),
            // Keys pasted into .env files usually carry literal "\n" escapes
            private_key: env("GOOGLE_PRIVATE_KEY").map(|k| k.replace("\\n", "\n")),
            client_email: env("GOOGLE_CLIENT_EMAIL"),
            client_id: env("GOOGLE_CLIENT_ID"),
            client_cert_url: env("GOOGLE_CLIENT_CERT_URL"),
        }
    }

    /// Names of the required variables that are unset
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("GOOGLE_PROJECT_ID", &self.project_id),
            ("GOOGLE_PRIVATE_KEY_ID", &self.private_key_id),
            ("GOOGLE_PRIVATE_KEY", &self.private_key),
            ("GOOGLE_CLIENT_EMAIL", &self.client_email),
            ("GOOGLE_CLIENT_ID", &self.client_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

impl SheetConfig {
    /// Create from file config with env overrides and defaults
    pub fn from_file(file: Option<FileSheet>, env: EnvLookup<'_>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            id: env("GOOGLE_SHEET_ID").or(file.id.filter(|id| !id.trim().is_empty())),
            range: env("GOOGLE_SHEET_RANGE")
                .or(file.range)
                .unwrap_or(defaults.range),
            credentials_file: env("GOOGLE_APPLICATION_CREDENTIALS")
                .or(file.credentials_file)
                .map(PathBuf::from),
            credentials: GoogleCredentialEnv::from_env(env),
            api_base: file.api_base.unwrap_or(defaults.api_base),
            token_uri: file.token_uri.unwrap_or(defaults.token_uri),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }

    /// Whether a sheet ID is set
    pub fn is_configured(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}
