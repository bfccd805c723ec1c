//! Matcher-backed predicates

use serde_json::Value;

use super::matcher::MatcherFactory;
use super::verification::Verification;
use crate::common::Result;
use crate::context::Context;

/// One compiled check against an extracted value
#[derive(Debug, Clone)]
pub struct Predicate {
    factory: MatcherFactory,
}

impl Predicate {
    pub fn new(factory: MatcherFactory) -> Self {
        Self { factory }
    }

    /// Evaluate against a value. A mismatch becomes a FAILURE verification
    /// naming the expectation and the actual value; type faults escape.
    pub fn verify(&self, actual: &Value, context: &Context) -> Result<Verification> {
        let matcher = self.factory.create(context);
        if matcher.matches(actual)? {
            Ok(Verification::succeed())
        } else {
            Ok(Verification::fail(format!(
                "expected a value to {}, but was {}",
                matcher, actual
            )))
        }
    }
}

impl From<MatcherFactory> for Predicate {
    fn from(factory: MatcherFactory) -> Self {
        Self::new(factory)
    }
}
