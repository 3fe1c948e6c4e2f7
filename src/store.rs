//! Read-only access to the dclisync member store
//!
//! The store is a SQLite file owned by `dclisync`. This process only reads
//! it, through a short-lived connection opened with `SQLITE_OPEN_READ_ONLY`;
//! writes happen exclusively through `dclisync --add`.
//!
//! # Schema contract
//!
//! ```text
//! members(bungie_display_name TEXT, ...)
//! ```
//!
//! Anything else (missing file, missing table or column) is reported as
//! [`StoreError`] so the caller can fall back to the list command.

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::identifier::{fold, Identifier};

/// The store could not answer the query
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database does not exist yet: {0}")]
    Missing(PathBuf),

    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database schema mismatch: {0}")]
    Schema(String),

    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// A registered member as seen by a lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub display_name: String,
}

/// Read interface over the registered roster
pub trait MemberDirectory: Send + Sync {
    /// Distinct, non-empty display names, normalized.
    ///
    /// Rows that are not `name#tag` shaped are skipped.
    fn known_identifiers(&self) -> Result<Vec<Identifier>, StoreError>;

    /// Case-insensitive lookup of one member. `Ok(None)` means not registered.
    fn find_member(&self, display_name: &str) -> Result<Option<Member>, StoreError>;
}

const KNOWN_MEMBERS_SQL: &str = "
    SELECT DISTINCT bungie_display_name
    FROM members
    WHERE bungie_display_name IS NOT NULL
      AND bungie_display_name != ''
    ORDER BY bungie_display_name";

// SQLite's LOWER() only folds ASCII, so matching happens in Rust
const MEMBER_NAMES_SQL: &str = "
    SELECT bungie_display_name
    FROM members
    WHERE bungie_display_name IS NOT NULL
      AND bungie_display_name != ''
    ORDER BY rowid";

/// SQLite-backed member directory
#[derive(Debug, Clone)]
pub struct SqliteMemberDirectory {
    path: PathBuf,
}

impl SqliteMemberDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-only connection and verify the schema contract
    fn connect(&self) -> Result<Connection, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }

        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })?;

        verify_schema(&conn)?;
        tracing::debug!(path = %self.path.display(), "connected to member store");
        Ok(conn)
    }
}

/// Check that `members.bungie_display_name` exists
fn verify_schema(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('members')")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(StoreError::Schema("table `members` not found".to_string()));
    }
    if !columns.iter().any(|c| c == "bungie_display_name") {
        return Err(StoreError::Schema(
            "column `members.bungie_display_name` not found".to_string(),
        ));
    }
    Ok(())
}

impl MemberDirectory for SqliteMemberDirectory {
    fn known_identifiers(&self) -> Result<Vec<Identifier>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(KNOWN_MEMBERS_SQL)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let total = names.len();
        let known: Vec<Identifier> = names.iter().filter_map(|n| Identifier::parse(n)).collect();
        if known.len() < total {
            tracing::debug!(
                skipped = total - known.len(),
                "ignored display names without a #tag"
            );
        }

        tracing::info!(count = known.len(), "found existing members in database");
        Ok(known)
    }

    fn find_member(&self, display_name: &str) -> Result<Option<Member>, StoreError> {
        let wanted = fold(display_name);
        let conn = self.connect()?;
        let mut stmt = conn.prepare(MEMBER_NAMES_SQL)?;
        for name in stmt.query_map([], |row| row.get::<_, String>(0))? {
            let name = name?;
            if fold(&name) == wanted {
                return Ok(Some(Member { display_name: name }));
            }
        }
        Ok(None)
    }
}
