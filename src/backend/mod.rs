//! Roster backend abstraction
//!
//! The authoritative roster is owned by an external tool (`dclisync` over its
//! own SQLite database). This module models it as a capability with two
//! operations so the sync can run against an in-memory fake in tests.
//!
//! ```text
//! RosterBackend trait
//! ├── DcliBackend (spawns `dclisync --list` / `--add`)
//! └── test fakes
//! ```

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::identifier::Identifier;

mod dcli;

pub use dcli::DcliBackend;

/// Failure of a single backend command
#[derive(Debug, Error)]
pub enum BackendError {
    /// The process could not be started (binary missing, permissions)
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish in time and was killed
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The process exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// No API key to authenticate the tool with
    #[error("BUNGIE_API_KEY is not set")]
    MissingApiKey,
}

/// External registration target for roster members
///
/// Implementations must tolerate being called strictly sequentially; the
/// writer never overlaps two calls.
#[async_trait]
pub trait RosterBackend: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Identifiers currently registered
    async fn list(&self) -> Result<Vec<Identifier>, BackendError>;

    /// Register one identifier
    async fn add(&self, identifier: &Identifier) -> Result<(), BackendError>;
}
