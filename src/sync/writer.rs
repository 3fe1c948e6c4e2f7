//! Sequential registration of new roster members
//!
//! One `add` at a time, with a fixed pause between consecutive calls (none
//! after the last). A failed add is recorded and the batch moves on; there
//! is no retry and no backoff.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::backend::RosterBackend;
use crate::identifier::Identifier;

/// Outcome of registering one identifier
#[derive(Debug, Clone, Serialize)]
pub struct AddResult {
    pub user: Identifier,
    pub success: bool,
    /// Redacted failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-identifier results of one add loop
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<AddResult>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failed_users(&self) -> Vec<&Identifier> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| &r.user)
            .collect()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User sync completed:")?;
        writeln!(f, "  Successfully added: {} users", self.succeeded())?;
        write!(f, "  Failed to add: {} users", self.failed())?;

        let failed = self.failed_users();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(|id| id.as_str()).collect();
            write!(f, "\n  Failed users: {}", names.join(", "))?;
        }
        Ok(())
    }
}

/// Drives `RosterBackend::add` over a batch, strictly one at a time
pub struct RosterWriter<'a> {
    backend: &'a dyn RosterBackend,
    delay: Duration,
}

impl<'a> RosterWriter<'a> {
    pub fn new(backend: &'a dyn RosterBackend, delay: Duration) -> Self {
        Self { backend, delay }
    }

    /// Register every identifier, in order
    pub async fn add_all(&self, users: &[Identifier]) -> SyncReport {
        let started_at = Utc::now();
        let mut results = Vec::with_capacity(users.len());

        for (i, user) in users.iter().enumerate() {
            let result = match self.backend.add(user).await {
                Ok(()) => {
                    tracing::info!(user = %user, "successfully added user");
                    AddResult {
                        user: user.clone(),
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!(user = %user, error = %e, "failed to add user");
                    AddResult {
                        user: user.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);

            if i + 1 < users.len() && !self.delay.is_zero() {
                tracing::info!(delay = ?self.delay, "waiting before adding next user");
                tokio::time::sleep(self.delay).await;
            }
        }

        SyncReport {
            started_at,
            finished_at: Utc::now(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::FakeBackend;
    use tokio::time::Instant;

    fn ids(raw: &[&str]) -> Vec<Identifier> {
        raw.iter().map(|r| Identifier::parse(r).unwrap()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_adds_in_order_with_delay_between() {
        let backend = FakeBackend::listing(&[]);
        let writer = RosterWriter::new(&backend, Duration::from_secs(2));
        let users = ids(&["a#1", "b#2", "c#3"]);

        let start = Instant::now();
        let report = writer.add_all(&users).await;

        // Two gaps for three users, no pause after the last one
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(backend.added(), users);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 0);

        let times = backend.add_times();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_user_has_no_delay() {
        let backend = FakeBackend::listing(&[]);
        let writer = RosterWriter::new(&backend, Duration::from_secs(2));

        let start = Instant::now();
        writer.add_all(&ids(&["solo#1"])).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_abort_batch() {
        let backend = FakeBackend::listing(&[]).failing_on(&["b#2"]);
        let writer = RosterWriter::new(&backend, Duration::from_secs(2));
        let users = ids(&["a#1", "b#2", "c#3"]);

        let report = writer.add_all(&users).await;

        assert_eq!(backend.attempted(), users);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failed_users(), vec![&users[1]]);
        assert!(report.results[1].error.is_some());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let backend = FakeBackend::listing(&[]);
        let report = RosterWriter::new(&backend, Duration::from_secs(2))
            .add_all(&[])
            .await;
        assert!(report.results.is_empty());
        assert_eq!(backend.attempted().len(), 0);
    }

    #[test]
    fn test_report_summary_lists_failures() {
        let report = SyncReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            results: vec![
                AddResult {
                    user: Identifier::parse("a#1").unwrap(),
                    success: true,
                    error: None,
                },
                AddResult {
                    user: Identifier::parse("b#2").unwrap(),
                    success: false,
                    error: Some("exit status: 1".to_string()),
                },
            ],
        };

        let text = report.to_string();
        assert!(text.contains("Successfully added: 1 users"));
        assert!(text.contains("Failed to add: 1 users"));
        assert!(text.contains("Failed users: b#2"));
    }
}
