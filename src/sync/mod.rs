//! Sync manager: one pass from sheet to dcli roster
//!
//! ```text
//! CheckConfigured ──no sheet──► Skipped
//!       │
//!       ▼
//! FetchCandidates ──error──► Err(SourceError)
//!       │ []──► NoCandidates
//!       ▼
//! FetchKnown (store → list → [])
//!       │
//!       ▼
//! Reconcile ──[]──► UpToDate
//!       │ dry run──► DryRun
//!       ▼
//! AddLoop ──► Completed(report)
//! ```
//!
//! Only a sheet failure aborts the run. Everything after that degrades or is
//! reported per identifier.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::backend::RosterBackend;
use crate::identifier::Identifier;
use crate::sheets::{fetch_candidates, RosterSource, SourceError};
use crate::store::MemberDirectory;

mod known;
mod reconcile;
mod writer;

#[cfg(test)]
pub(crate) mod testing;

use known::existing_roster;
use reconcile::reconcile;
pub use writer::{RosterWriter, SyncReport};

/// Per-run knobs
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Stop after reconcile and report what would be added
    pub dry_run: bool,
    /// Pause between consecutive add calls
    pub add_delay: Duration,
}

/// How a run ended, short of a fatal sheet error
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No sheet configured; nothing was contacted
    Skipped,
    /// The sheet had no usable identifiers
    NoCandidates,
    /// Every candidate is already registered
    UpToDate { candidates: usize },
    /// Identifiers that a real run would add
    DryRun { pending: Vec<Identifier> },
    Completed(SyncReport),
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Skipped => write!(f, "Google Sheets not configured. Skipping user sync."),
            SyncOutcome::NoCandidates => write!(f, "No users found in sheet."),
            SyncOutcome::UpToDate { candidates } => {
                write!(f, "All {} users from sheet are already registered.", candidates)
            }
            SyncOutcome::DryRun { pending } => {
                write!(f, "Dry run: {} new users would be added", pending.len())?;
                for user in pending {
                    write!(f, "\n  {}", user)?;
                }
                Ok(())
            }
            SyncOutcome::Completed(report) => write!(f, "{}", report),
        }
    }
}

/// Short id for correlating one run's log lines, e.g. `20260118-093012-a3f2`
pub fn generate_run_id() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let random = RandomState::new().build_hasher().finish();
    format!("{}-{:04x}", timestamp, random & 0xFFFF)
}

/// Runs one sync pass over the injected seams
pub struct SyncManager<'a> {
    /// `None` when no spreadsheet is configured
    source: Option<&'a dyn RosterSource>,
    store: &'a dyn MemberDirectory,
    backend: &'a dyn RosterBackend,
    options: SyncOptions,
}

impl<'a> SyncManager<'a> {
    pub fn new(
        source: Option<&'a dyn RosterSource>,
        store: &'a dyn MemberDirectory,
        backend: &'a dyn RosterBackend,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            store,
            backend,
            options,
        }
    }

    /// Run the pass.
    ///
    /// # Errors
    /// Only when the sheet cannot be read. Store, list and add failures are
    /// absorbed into the outcome.
    pub async fn run(&self) -> Result<SyncOutcome, SourceError> {
        let Some(source) = self.source else {
            tracing::info!("Google Sheets not configured, skipping user sync");
            return Ok(SyncOutcome::Skipped);
        };

        let candidates = fetch_candidates(source).await?;
        if candidates.is_empty() {
            tracing::info!("no users found in sheet");
            return Ok(SyncOutcome::NoCandidates);
        }

        let known = existing_roster(self.store, self.backend).await;
        tracing::info!(count = known.len(), "found existing users");

        let pending = reconcile(&candidates, &known);
        if pending.is_empty() {
            tracing::info!("all users from sheet are already registered");
            return Ok(SyncOutcome::UpToDate {
                candidates: candidates.len(),
            });
        }
        tracing::info!(count = pending.len(), "new users to add");

        if self.options.dry_run {
            for user in &pending {
                tracing::info!(user = %user, "would add user");
            }
            return Ok(SyncOutcome::DryRun { pending });
        }

        let report = RosterWriter::new(self.backend, self.options.add_delay)
            .add_all(&pending)
            .await;
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "user sync completed"
        );
        Ok(SyncOutcome::Completed(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::{FakeBackend, FakeDirectory, FakeSource};

    fn ids(raw: &[&str]) -> Vec<Identifier> {
        raw.iter().map(|r| Identifier::parse(r).unwrap()).collect()
    }

    fn manager<'a>(
        source: &'a FakeSource,
        store: &'a FakeDirectory,
        backend: &'a FakeBackend,
        options: SyncOptions,
    ) -> SyncManager<'a> {
        let source: &dyn RosterSource = source;
        SyncManager::new(Some(source), store, backend, options)
    }

    fn options() -> SyncOptions {
        SyncOptions {
            dry_run: false,
            add_delay: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_sheet_touches_nothing() {
        let store = FakeDirectory::with(&["alpha#1111"]);
        let backend = FakeBackend::listing(&[]);

        let outcome = SyncManager::new(None, &store, &backend, options())
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Skipped));
        assert_eq!(store.calls(), 0);
        assert_eq!(backend.list_calls(), 0);
        assert!(backend.attempted().is_empty());
    }

    #[tokio::test]
    async fn test_sheet_failure_is_fatal() {
        let source = FakeSource::failing();
        let store = FakeDirectory::with(&[]);
        let backend = FakeBackend::listing(&[]);

        let result = manager(&source, &store, &backend, options())
            .run()
            .await;

        assert!(matches!(result, Err(SourceError::Api { status: 403, .. })));
        assert_eq!(source.calls(), 1);
        assert_eq!(store.calls(), 0);
        assert!(backend.attempted().is_empty());
    }

    #[tokio::test]
    async fn test_blank_sheet_has_no_candidates() {
        let source = FakeSource::column(&["", "  ", "no tag"]);
        let store = FakeDirectory::with(&[]);
        let backend = FakeBackend::listing(&[]);

        let outcome = manager(&source, &store, &backend, options())
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::NoCandidates));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adds_only_unknown_users() {
        let source = FakeSource::column(&["Alpha#1111", "beta#2222", "", "Gamma#3333"]);
        let store = FakeDirectory::with(&["ALPHA#1111"]);
        let backend = FakeBackend::listing(&[]);

        let outcome = manager(&source, &store, &backend, options())
            .run()
            .await
            .unwrap();

        assert_eq!(backend.attempted(), ids(&["beta#2222", "gamma#3333"]));
        assert_eq!(backend.list_calls(), 0);
        match outcome {
            SyncOutcome::Completed(report) => assert_eq!(report.succeeded(), 2),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_failure_still_completes() {
        let source = FakeSource::column(&["Alpha#1111", "beta#2222"]);
        let store = FakeDirectory::with(&["alpha#1111"]);
        let backend = FakeBackend::listing(&[]).failing_on(&["beta#2222"]);

        let outcome = manager(&source, &store, &backend, options())
            .run()
            .await
            .unwrap();

        assert_eq!(backend.attempted(), ids(&["beta#2222"]));
        match outcome {
            SyncOutcome::Completed(report) => {
                assert_eq!(report.succeeded(), 0);
                assert_eq!(report.failed(), 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_roster_adds_everything() {
        let source = FakeSource::column(&["a#1", "b#2"]);
        let store = FakeDirectory::unavailable();
        let backend = FakeBackend::listing_fails();

        manager(&source, &store, &backend, options())
            .run()
            .await
            .unwrap();

        assert_eq!(backend.list_calls(), 1);
        assert_eq!(backend.attempted(), ids(&["a#1", "b#2"]));
    }

    #[tokio::test]
    async fn test_up_to_date() {
        let source = FakeSource::column(&["alpha#1111", "ALPHA#1111"]);
        let store = FakeDirectory::unavailable();
        let backend = FakeBackend::listing(&["Alpha#1111"]);

        let outcome = manager(&source, &store, &backend, options())
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::UpToDate { candidates: 2 }));
        assert!(backend.attempted().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_adds_nothing() {
        let source = FakeSource::column(&["a#1", "b#2"]);
        let store = FakeDirectory::with(&["b#2"]);
        let backend = FakeBackend::listing(&[]);
        let opts = SyncOptions {
            dry_run: true,
            ..options()
        };

        let outcome = manager(&source, &store, &backend, opts)
            .run()
            .await
            .unwrap();

        match outcome {
            SyncOutcome::DryRun { pending } => assert_eq!(pending, ids(&["a#1"])),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(backend.attempted().is_empty());
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let json = serde_json::to_value(SyncOutcome::DryRun {
            pending: ids(&["a#1"]),
        })
        .unwrap();
        assert_eq!(json["status"], "dry_run");
        assert_eq!(json["pending"][0], "a#1");

        let json = serde_json::to_value(SyncOutcome::Skipped).unwrap();
        assert_eq!(json["status"], "skipped");
    }

    #[test]
    fn test_run_id_shape() {
        let id = generate_run_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[2].len(), 4);
    }
}
