//! Recursive verification result tree

use std::fmt;

use serde::Serialize;

use super::status::Status;

/// Result of one check: a status, an optional diagnostic message, and the
/// child verifications it was merged from. Built once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Verification {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Verification>,
}

impl Verification {
    /// Leaf success
    pub fn succeed() -> Self {
        Self {
            status: Status::Success,
            ..Self::default()
        }
    }

    /// Leaf with nothing checked
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Leaf failure carrying a diagnostic message
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            message: Some(message.into()),
            children: Vec::new(),
        }
    }

    /// Leaf failure from a caught error
    pub fn of_error(error: &impl fmt::Display) -> Self {
        Self::fail(error.to_string())
    }

    /// Fold children into a parent whose status is the worst among them,
    /// keeping the children for diagnostics. Empty children yield SKIPPED.
    pub fn collect<I>(children: I) -> Self
    where
        I: IntoIterator<Item = Verification>,
    {
        let children: Vec<Verification> = children.into_iter().collect();
        let status = Status::merge_all(children.iter().map(|c| c.status));
        Self {
            status,
            message: None,
            children,
        }
    }

    /// Attach a human-readable name to this verification
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
