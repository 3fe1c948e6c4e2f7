//! Set difference between the sheet roster and the registered roster

use std::collections::HashSet;

use crate::identifier::Identifier;

/// Candidates not present in `known`, in candidate order.
///
/// Identifiers are already normalized, so equality is case-insensitive.
/// Duplicate candidates collapse to their first occurrence: an identifier
/// is registered at most once per run.
pub fn reconcile(candidates: &[Identifier], known: &[Identifier]) -> Vec<Identifier> {
    let mut seen: HashSet<&Identifier> = known.iter().collect();
    candidates
        .iter()
        .filter(|candidate| seen.insert(*candidate))
        .cloned()
        .collect()
}
