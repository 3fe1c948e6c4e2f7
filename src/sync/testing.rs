//! In-memory fakes for the sync seams

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::backend::{BackendError, RosterBackend};
use crate::identifier::Identifier;
use crate::sheets::{Rows, RosterSource, SourceError};
use crate::store::{Member, MemberDirectory, StoreError};

fn ids(raw: &[&str]) -> Vec<Identifier> {
    raw.iter().filter_map(|r| Identifier::parse(r)).collect()
}

fn command_failed(command: &str) -> BackendError {
    BackendError::Failed {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        stderr: String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

pub struct FakeBackend {
    listed: Option<Vec<Identifier>>,
    failing: HashSet<Identifier>,
    list_calls: AtomicUsize,
    attempts: Mutex<Vec<(Identifier, Instant)>>,
}

impl FakeBackend {
    pub fn listing(raw: &[&str]) -> Self {
        Self {
            listed: Some(ids(raw)),
            failing: HashSet::new(),
            list_calls: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn listing_fails() -> Self {
        Self {
            listed: None,
            ..Self::listing(&[])
        }
    }

    pub fn failing_on(mut self, raw: &[&str]) -> Self {
        self.failing = ids(raw).into_iter().collect();
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Every identifier `add` was called with
    pub fn attempted(&self) -> Vec<Identifier> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Identifiers whose `add` succeeded
    pub fn added(&self) -> Vec<Identifier> {
        self.attempted()
            .into_iter()
            .filter(|id| !self.failing.contains(id))
            .collect()
    }

    pub fn add_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl RosterBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list(&self) -> Result<Vec<Identifier>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listed.clone().ok_or_else(|| command_failed("fake --list"))
    }

    async fn add(&self, identifier: &Identifier) -> Result<(), BackendError> {
        self.attempts
            .lock()
            .unwrap()
            .push((identifier.clone(), Instant::now()));
        if self.failing.contains(identifier) {
            return Err(command_failed("fake --add"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Member store
// ─────────────────────────────────────────────────────────────────────────────

pub struct FakeDirectory {
    members: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn with(names: &[&str]) -> Self {
        Self {
            members: Some(names.iter().map(|n| n.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            members: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn members(&self) -> Result<&[String], StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.members
            .as_deref()
            .ok_or_else(|| StoreError::Missing("/nonexistent/dcli.sqlite3".into()))
    }
}

impl MemberDirectory for FakeDirectory {
    fn known_identifiers(&self) -> Result<Vec<Identifier>, StoreError> {
        Ok(self
            .members()?
            .iter()
            .filter_map(|n| Identifier::parse(n))
            .collect())
    }

    fn find_member(&self, display_name: &str) -> Result<Option<Member>, StoreError> {
        Ok(self
            .members()?
            .iter()
            .find(|n| n.eq_ignore_ascii_case(display_name.trim()))
            .map(|n| Member {
                display_name: n.clone(),
            }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sheet
// ─────────────────────────────────────────────────────────────────────────────

pub struct FakeSource {
    rows: Option<Rows>,
    calls: AtomicUsize,
}

impl FakeSource {
    /// One cell per row, column A
    pub fn column(cells: &[&str]) -> Self {
        Self {
            rows: Some(cells.iter().map(|c| vec![c.to_string()]).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            rows: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RosterSource for FakeSource {
    fn describe(&self) -> String {
        "fake sheet".to_string()
    }

    async fn fetch_rows(&self) -> Result<Rows, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.clone().ok_or(SourceError::Api {
            status: 403,
            message: "The caller does not have permission".to_string(),
        })
    }
}
