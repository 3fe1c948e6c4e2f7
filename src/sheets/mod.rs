//! Roster source: identifiers from a Google Sheet
//!
//! Reads a range with the Sheets API v4 and keeps the first column:
//!
//! ```text
//! GET {api_base}/v4/spreadsheets/{id}/values/{range}
//! Authorization: Bearer <service account token>
//!
//! { "range": "Sheet1!A1:A3", "values": [["Alpha#1111"], [], ["beta#2222"]] }
//! ```
//!
//! The source never writes to the sheet.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::SheetConfig;
use crate::identifier::{parse_all, Identifier};

mod auth;

pub use auth::{fetch_access_token, ServiceAccountKey};

/// The sheet could not be read. Fatal for a sync run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no spreadsheet id configured")]
    NotConfigured,

    #[error("invalid Google credentials: {0}")]
    Credentials(String),

    #[error("cannot read credentials file {path}: {source}")]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sign service account assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid API base URL: {0}")]
    Url(String),
}

/// Raw rows of cell text, as returned for a range
pub type Rows = Vec<Vec<String>>;

/// Something that yields rows of cells for the configured range
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Human-readable description for logging (sheet id and range)
    fn describe(&self) -> String;

    async fn fetch_rows(&self) -> Result<Rows, SourceError>;
}

/// Apply the candidate filter to raw rows.
///
/// Column A only; blank cells, missing cells and values without `#` are
/// dropped; the rest is trimmed and lowercased.
pub fn candidates_from_rows(rows: &[Vec<String>]) -> Vec<Identifier> {
    parse_all(rows.iter().filter_map(|row| row.first()).map(String::as_str))
}

/// Fetch rows and reduce them to candidate identifiers
pub async fn fetch_candidates(source: &dyn RosterSource) -> Result<Vec<Identifier>, SourceError> {
    tracing::info!(source = %source.describe(), "reading users from sheet");
    let rows = source.fetch_rows().await?;
    let candidates = candidates_from_rows(&rows);
    tracing::info!(
        rows = rows.len(),
        users = candidates.len(),
        "found users in sheet"
    );
    Ok(candidates)
}

// ─────────────────────────────────────────────────────────────────────────────
// Sheets API v4
// ─────────────────────────────────────────────────────────────────────────────

/// `spreadsheets.values.get` response body
#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the range is empty
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Render a cell as text; the API returns formatted strings by default
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_value_range(body: &str) -> Result<Rows, SourceError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect())
}

/// Reads the roster from Google Sheets using a service account
pub struct GoogleSheetsSource {
    client: reqwest::Client,
    spreadsheet_id: String,
    range: String,
    api_base: String,
    token_uri: String,
    key: ServiceAccountKey,
}

impl GoogleSheetsSource {
    /// Build a source from config.
    ///
    /// # Errors
    /// Returns an error if no sheet id is set, credentials are incomplete,
    /// or the HTTP client cannot be created.
    pub fn new(config: &SheetConfig) -> Result<Self, SourceError> {
        let spreadsheet_id = config
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(SourceError::NotConfigured)?;
        let key = ServiceAccountKey::resolve(config)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::debug!(
            client_email = %key.client_email,
            api_base = %config.api_base,
            "initialized Google Sheets client"
        );

        Ok(Self {
            client,
            spreadsheet_id,
            range: config.range.clone(),
            api_base: config.api_base.clone(),
            token_uri: config.token_uri.clone(),
            key,
        })
    }

    /// `{api_base}/v4/spreadsheets/{id}/values/{range}`, each segment percent-encoded
    fn values_url(&self) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| SourceError::Url(format!("{}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Url(self.api_base.clone()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.range.as_str(),
            ]);
        Ok(url)
    }
}

#[async_trait]
impl RosterSource for GoogleSheetsSource {
    fn describe(&self) -> String {
        format!("sheet {} range {}", self.spreadsheet_id, self.range)
    }

    async fn fetch_rows(&self) -> Result<Rows, SourceError> {
        let token = fetch_access_token(&self.client, &self.key, &self.token_uri).await?;
        let url = self.values_url()?;

        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        parse_value_range(&body)
    }
}
