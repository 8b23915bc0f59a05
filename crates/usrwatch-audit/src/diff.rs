//! Set difference between two entity lists.

use std::collections::HashSet;
use std::fmt;

/// Line prefix for entities present before but not after.
pub const REMOVED_PREFIX: &str = "Username removed: ";

/// Line prefix for entities present after but not before.
pub const ADDED_PREFIX: &str = "Username added: ";

/// Entities removed and added between two snapshots.
///
/// Both sides are compared by membership only: duplicates are not collapsed
/// and multiplicity is not tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDiff {
    /// Entities of `before` missing from `after`, in `before` order.
    pub removed: Vec<String>,
    /// Entities of `after` missing from `before`, in `after` order.
    pub added: Vec<String>,
}

impl EntityDiff {
    /// Compare two entity lists.
    pub fn between(before: &[String], after: &[String]) -> Self {
        let before_set: HashSet<&str> = before.iter().map(String::as_str).collect();
        let after_set: HashSet<&str> = after.iter().map(String::as_str).collect();

        let removed = before
            .iter()
            .filter(|e| !after_set.contains(e.as_str()))
            .cloned()
            .collect();
        let added = after
            .iter()
            .filter(|e| !before_set.contains(e.as_str()))
            .cloned()
            .collect();

        Self { removed, added }
    }

    /// True when both lists hold the same members.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

impl fmt::Display for EntityDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entity in &self.removed {
            writeln!(f, "{REMOVED_PREFIX}{entity}")?;
        }
        for entity in &self.added {
            writeln!(f, "{ADDED_PREFIX}{entity}")?;
        }
        Ok(())
    }
}

/// Render the difference as report text.
///
/// Removed lines come first, then added lines, each terminated by `\n`.
/// An empty string means the member sets are identical and nothing should
/// be reported.
pub fn diff(before: &[String], after: &[String]) -> String {
    EntityDiff::between(before, after).to_string()
}
