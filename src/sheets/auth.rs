//! Google service account authentication
//!
//! Implements the two-legged OAuth flow for service accounts:
//!
//! ```text
//! ServiceAccountKey ──sign RS256──► JWT assertion
//!        │
//!        └──POST token_uri (jwt-bearer grant)──► access_token
//! ```
//!
//! Tokens are fetched once per run; a run is far shorter than the one hour
//! token lifetime, so there is no refresh logic.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::SourceError;
use crate::config::{GoogleCredentialEnv, SheetConfig};
use crate::secret::REDACTED;

/// Read-only access to spreadsheets
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime in seconds (Google's maximum)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service account key that the token flow needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &REDACTED)
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// JWT claim set for the jwt-bearer grant
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    /// Load a service account JSON key file
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| SourceError::CredentialsFile {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&contents).map_err(|e| {
            SourceError::Credentials(format!("invalid key file {}: {}", path.display(), e))
        })
    }

    /// Assemble a key from the individual GOOGLE_* variables
    pub fn from_env(env: &GoogleCredentialEnv) -> Result<Self, SourceError> {
        let missing = env.missing();
        if !missing.is_empty() {
            return Err(SourceError::Credentials(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        // `missing()` just confirmed these are set
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok(Self {
            project_id: env.project_id.clone(),
            private_key_id: field(&env.private_key_id),
            private_key: field(&env.private_key),
            client_email: field(&env.client_email),
            client_id: env.client_id.clone(),
        })
    }

    /// Credentials file if configured, otherwise the environment fields
    pub fn resolve(config: &SheetConfig) -> Result<Self, SourceError> {
        match &config.credentials_file {
            Some(path) => Self::from_file(path),
            None => Self::from_env(&config.credentials),
        }
    }

    pub(crate) fn claims(&self, token_uri: &str, now: DateTime<Utc>) -> Claims {
        let iat = now.timestamp();
        Claims {
            iss: self.client_email.clone(),
            scope: SHEETS_READONLY_SCOPE.to_string(),
            aud: token_uri.to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign the RS256 assertion exchanged for an access token
    pub fn assertion(&self, token_uri: &str, now: DateTime<Utc>) -> Result<String, SourceError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.private_key_id.clone());

        Ok(jsonwebtoken::encode(
            &header,
            &self.claims(token_uri, now),
            &key,
        )?)
    }
}

/// Exchange a signed assertion for an access token
pub async fn fetch_access_token(
    client: &reqwest::Client,
    key: &ServiceAccountKey,
    token_uri: &str,
) -> Result<String, SourceError> {
    let assertion = key.assertion(token_uri, Utc::now())?;

    let response = client
        .post(token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(SourceError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| SourceError::Decode(format!("token response: {}", e)))?;

    tracing::debug!(client_email = %key.client_email, "obtained Google access token");
    Ok(body.access_token)
}
