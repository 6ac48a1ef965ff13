//! Set difference between a submitted selection and the stored state.
//!
//! Relation editors submit the complete list of related names; [`compare_lists`]
//! turns that into the rows to insert and the rows to delete.

use std::collections::BTreeSet;

/// Result of comparing a selected list against the current list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListDiff {
    /// Present in the selection only.
    pub to_add: Vec<String>,
    /// Present in the current state only.
    pub to_remove: Vec<String>,
}

impl ListDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Returns `selected - current` and `current - selected`, both sorted.
pub fn compare_lists<S, C>(selected: S, current: C) -> ListDiff
where
    S: IntoIterator,
    S::Item: AsRef<str>,
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let selected: BTreeSet<String> = selected
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();
    let current: BTreeSet<String> = current
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();

    ListDiff {
        to_add: selected.difference(&current).cloned().collect(),
        to_remove: current.difference(&selected).cloned().collect(),
    }
}
