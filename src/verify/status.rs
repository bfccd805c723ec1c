//! Outcome severity lattice
//!
//! Every check in the engine summarizes to one of four statuses, totally
//! ordered by severity. Aggregation anywhere in the result tree is a merge
//! that keeps the worst status seen.

use std::fmt;

use serde::Serialize;

/// Outcome of a check, ordered by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Nothing ran (disabled case, empty group, unmet precondition)
    #[default]
    Skipped,
    /// Ran and passed
    Success,
    /// Ran with tolerated deviations
    Unstable,
    /// Ran and failed, or could not run at all
    Failure,
}

impl Status {
    /// Whether this status counts as a passing outcome
    pub fn is_succeeded(self) -> bool {
        matches!(self, Status::Skipped | Status::Success)
    }

    /// Merge two statuses, keeping the worse severity
    pub fn merge(self, other: Status) -> Status {
        self.max(other)
    }

    /// Merge a sequence of statuses; empty yields SKIPPED
    pub fn merge_all<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().fold(Status::Skipped, Status::merge)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Skipped => "SKIPPED",
            Status::Success => "SUCCESS",
            Status::Unstable => "UNSTABLE",
            Status::Failure => "FAILURE",
        };
        write!(f, "{}", name)
    }
}

/// Carried by result records that expose an outcome status
pub trait Statused {
    fn status(&self) -> Status;
}

/// A result group tagged with the merge of its members' statuses
///
/// An empty group is SKIPPED: nothing ran, nothing failed.
#[derive(Debug, Clone, Serialize)]
pub struct StatusedList<T> {
    pub status: Status,
    pub items: Vec<T>,
}

impl<T: Statused> StatusedList<T> {
    pub fn collect(items: Vec<T>) -> Self {
        let status = Status::merge_all(items.iter().map(Statused::status));
        Self { status, items }
    }
}

impl<T> Default for StatusedList<T> {
    fn default() -> Self {
        Self {
            status: Status::Skipped,
            items: Vec::new(),
        }
    }
}
