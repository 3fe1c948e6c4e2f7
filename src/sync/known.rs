//! Existing roster: store first, list command second, empty last
//!
//! ```text
//! MemberDirectory::known_identifiers ──ok──► known
//!        │ StoreError
//!        ▼
//! RosterBackend::list ──ok──► known
//!        │ BackendError
//!        ▼
//! []  (assume nothing registered yet)
//! ```
//!
//! The empty fallback only costs redundant add attempts downstream, so this
//! reader never fails.

use crate::backend::RosterBackend;
use crate::identifier::Identifier;
use crate::store::MemberDirectory;

/// Best-effort list of identifiers already registered
pub async fn existing_roster(
    store: &dyn MemberDirectory,
    backend: &dyn RosterBackend,
) -> Vec<Identifier> {
    match store.known_identifiers() {
        Ok(known) => return known,
        Err(e) => {
            tracing::info!(error = %e, "member store unavailable, trying list command");
        }
    }

    match backend.list().await {
        Ok(known) => known,
        Err(e) => {
            tracing::warn!(
                error = %e,
                backend = backend.name(),
                "failed to get existing users, assuming none are registered"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{FakeBackend, FakeDirectory};

    fn ids(raw: &[&str]) -> Vec<Identifier> {
        raw.iter().map(|r| Identifier::parse(r).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_store_is_preferred() {
        let store = FakeDirectory::with(&["alpha#1111"]);
        let backend = FakeBackend::listing(&["beta#2222"]);

        let known = existing_roster(&store, &backend).await;

        assert_eq!(known, ids(&["alpha#1111"]));
        assert_eq!(backend.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_list_command_when_store_unavailable() {
        let store = FakeDirectory::unavailable();
        let backend = FakeBackend::listing(&["beta#2222"]);

        let known = existing_roster(&store, &backend).await;

        assert_eq!(known, ids(&["beta#2222"]));
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_when_both_fail() {
        let store = FakeDirectory::unavailable();
        let backend = FakeBackend::listing_fails();

        assert!(existing_roster(&store, &backend).await.is_empty());
    }
}
