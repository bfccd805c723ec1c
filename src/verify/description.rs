//! Extraction bound to predicates

use super::predicate::Predicate;
use super::verification::Verification;
use crate::common::Result;
use crate::context::Context;
use crate::extract::{Analyzer, Extractor};

/// A compiled check: extract one value, evaluate every predicate against
/// it, and merge the outcomes
#[derive(Debug, Clone)]
pub struct Description {
    extractor: Extractor,
    predicates: Vec<Predicate>,
    name: Option<String>,
}

impl Description {
    pub fn new(extractor: Extractor, predicates: Vec<Predicate>, name: Option<String>) -> Self {
        Self {
            extractor,
            predicates,
            name,
        }
    }

    /// Verify against an analyzed body. Extraction failures are recovered
    /// into a FAILURE verification carrying the error text; matcher type
    /// faults escape as Err.
    pub fn verify(&self, analyzer: &Analyzer, context: &Context) -> Result<Verification> {
        let value = match self.extractor.extract(analyzer) {
            Ok(value) => value,
            Err(error) => return Ok(self.named(Verification::of_error(&error))),
        };
        let mut children = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            children.push(predicate.verify(&value, context)?);
        }
        Ok(self.named(Verification::collect(children)))
    }

    fn named(&self, verification: Verification) -> Verification {
        let Some(name) = &self.name else {
            return verification;
        };
        let message = match &verification.message {
            Some(message) => format!("{}: {}", name, message),
            None => name.clone(),
        };
        verification.with_message(message)
    }
}
