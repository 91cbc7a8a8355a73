#![forbid(unsafe_code)]

//! Per-control record of which validators failed.

use std::collections::HashMap;

use super::{Validator, ValidatorId};

/// Mapping from validator identity to "has error".
///
/// Entries are overwritten on every validity pass and never removed, so an
/// identity that stopped running keeps its last recorded state. Looking up an
/// identity that was never recorded reports no error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: HashMap<ValidatorId, bool>,
}

impl ValidationErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `id`. Stores `!passed`, replacing any earlier entry.
    pub fn update(&mut self, id: ValidatorId, passed: bool) {
        self.entries.insert(id, !passed);
    }

    /// Whether any recorded validator failed.
    #[must_use]
    pub fn has_any_error(&self) -> bool {
        self.entries.values().any(|&failed| failed)
    }

    /// Whether `validator` failed on the last pass that ran it.
    #[must_use]
    pub fn get<V: ?Sized>(&self, validator: &Validator<V>) -> bool {
        self.get_id(validator.id())
    }

    /// Whether the validator with identity `id` failed.
    #[must_use]
    pub fn get_id(&self, id: ValidatorId) -> bool {
        self.entries.get(&id).copied().unwrap_or(false)
    }

    /// Identities currently recorded as failed, in ascending order.
    pub fn failing(&self) -> impl Iterator<Item = ValidatorId> + '_ {
        let mut ids: Vec<ValidatorId> = self
            .entries
            .iter()
            .filter_map(|(&id, &failed)| failed.then_some(id))
            .collect();
        ids.sort_unstable();
        ids.into_iter()
    }

    /// Number of recorded identities (passed or failed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
