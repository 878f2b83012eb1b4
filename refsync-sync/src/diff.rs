//! Symmetric set differences for drift reports.

use std::collections::BTreeSet;
use std::fmt;

/// One element present on only one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetChange {
    /// Present in the expected (specification or disk) side only.
    Added(String),
    /// Present in the manifest only.
    Removed(String),
}

impl SetChange {
    pub fn value(&self) -> &str {
        match self {
            SetChange::Added(value) | SetChange::Removed(value) => value,
        }
    }
}

impl fmt::Display for SetChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetChange::Added(value) => write!(f, "    added: {value}"),
            SetChange::Removed(value) => write!(f, "  removed: {value}"),
        }
    }
}

/// Elements of `current` missing from `recorded` are `Added`; the reverse
/// are `Removed`. Sorted by value.
pub fn set_changes(current: &BTreeSet<String>, recorded: &BTreeSet<String>) -> Vec<SetChange> {
    let mut changes: Vec<SetChange> = current
        .difference(recorded)
        .map(|v| SetChange::Added(v.clone()))
        .chain(recorded.difference(current).map(|v| SetChange::Removed(v.clone())))
        .collect();
    changes.sort_by(|a, b| a.value().cmp(b.value()));
    changes
}
