//! Composable matchers
//!
//! Predicate expressions compile ahead of time into matcher factories. A
//! factory is bound to a context with `create`, resolving embedded values
//! (e.g. relative datetimes) and inner factories eagerly; the resulting
//! matcher is then evaluated against extracted values.
//!
//! `matches` distinguishes a mismatch (`Ok(false)`) from a type fault
//! (`Err`): handing a regex matcher a number is a programming or schema
//! error, not a verification outcome, and it escapes to the caller.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::common::{Error, Result};
use crate::context::{BoundValue, Context};

/// Context-independent matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticOp {
    Anything,
    BeNull,
    BeEmpty,
}

/// Matchers parameterized by one resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOp {
    Equal,
    BeGreaterThan,
    BeGreaterThanOrEqualTo,
    BeLessThan,
    BeLessThanOrEqualTo,
    ContainString,
    StartWith,
    EndWith,
    MatchRegex,
    BeBefore,
    BeAfter,
}

/// Matchers composing inner matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorOp {
    Not,
    AllOf,
    AnyOf,
    HaveItem,
    HaveItems,
    ContainExactly,
    ContainInAnyOrder,
    HaveLength,
}

/// A compiled, context-parameterized predicate evaluator
#[derive(Debug, Clone)]
pub enum MatcherFactory {
    /// Ignores the context
    Static(StaticOp),
    /// Resolves one embedded value against the context
    Value(ValueOp, BoundValue),
    /// Resolves inner factories against the same context, then combines
    Recursive(CombinatorOp, Vec<MatcherFactory>),
}

impl MatcherFactory {
    /// Bind to a context, resolving embedded values and inner factories
    /// eagerly
    pub fn create(&self, context: &Context) -> Matcher {
        match self {
            MatcherFactory::Static(op) => Matcher::Static(*op),
            MatcherFactory::Value(op, value) => Matcher::Value(*op, value.resolve(context)),
            MatcherFactory::Recursive(op, inner) => Matcher::Combined(
                *op,
                inner.iter().map(|factory| factory.create(context)).collect(),
            ),
        }
    }
}

/// A matcher bound to a context, ready to evaluate values
#[derive(Debug, Clone)]
pub enum Matcher {
    Static(StaticOp),
    Value(ValueOp, Value),
    Combined(CombinatorOp, Vec<Matcher>),
}

impl Matcher {
    /// Evaluate the matcher. `Ok(false)` is a mismatch; `Err` is a type
    /// fault that the engine lets escape.
    pub fn matches(&self, actual: &Value) -> Result<bool> {
        match self {
            Matcher::Static(op) => match op {
                StaticOp::Anything => Ok(true),
                StaticOp::BeNull => Ok(actual.is_null()),
                StaticOp::BeEmpty => match actual {
                    Value::String(s) => Ok(s.is_empty()),
                    Value::Array(a) => Ok(a.is_empty()),
                    Value::Object(o) => Ok(o.is_empty()),
                    _ => Ok(false),
                },
            },
            Matcher::Value(op, expected) => match op {
                ValueOp::Equal => Ok(values_equal(expected, actual)),
                ValueOp::BeGreaterThan => Ok(compare(actual, expected)? == Ordering::Greater),
                ValueOp::BeGreaterThanOrEqualTo => {
                    Ok(compare(actual, expected)? != Ordering::Less)
                }
                ValueOp::BeLessThan => Ok(compare(actual, expected)? == Ordering::Less),
                ValueOp::BeLessThanOrEqualTo => {
                    Ok(compare(actual, expected)? != Ordering::Greater)
                }
                // String matchers fault on a bad operand but treat a
                // non-string actual as a plain mismatch.
                ValueOp::ContainString => {
                    let expected = as_str(expected)?;
                    Ok(actual.as_str().map_or(false, |a| a.contains(expected)))
                }
                ValueOp::StartWith => {
                    let expected = as_str(expected)?;
                    Ok(actual.as_str().map_or(false, |a| a.starts_with(expected)))
                }
                ValueOp::EndWith => {
                    let expected = as_str(expected)?;
                    Ok(actual.as_str().map_or(false, |a| a.ends_with(expected)))
                }
                ValueOp::MatchRegex => {
                    let pattern = Regex::new(as_str(expected)?)
                        .map_err(|e| Error::Evaluation(format!("invalid regex: {}", e)))?;
                    Ok(pattern.is_match(as_str(actual)?))
                }
                ValueOp::BeBefore => Ok(as_instant(actual)? < as_instant(expected)?),
                ValueOp::BeAfter => Ok(as_instant(actual)? > as_instant(expected)?),
            },
            Matcher::Combined(op, inner) => match op {
                CombinatorOp::Not => {
                    for matcher in inner {
                        if matcher.matches(actual)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                CombinatorOp::AllOf => {
                    for matcher in inner {
                        if !matcher.matches(actual)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                CombinatorOp::AnyOf => {
                    for matcher in inner {
                        if matcher.matches(actual)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                // Sequence matchers treat a non-array actual as a mismatch.
                CombinatorOp::HaveItem | CombinatorOp::HaveItems => {
                    let Some(items) = actual.as_array() else {
                        return Ok(false);
                    };
                    for matcher in inner {
                        let mut found = false;
                        for item in items {
                            if matcher.matches(item)? {
                                found = true;
                                break;
                            }
                        }
                        if !found {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                CombinatorOp::ContainExactly => {
                    let Some(items) = actual.as_array() else {
                        return Ok(false);
                    };
                    if items.len() != inner.len() {
                        return Ok(false);
                    }
                    for (matcher, item) in inner.iter().zip(items) {
                        if !matcher.matches(item)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                CombinatorOp::ContainInAnyOrder => {
                    let Some(items) = actual.as_array() else {
                        return Ok(false);
                    };
                    if items.len() != inner.len() {
                        return Ok(false);
                    }
                    let mut used = vec![false; inner.len()];
                    for item in items {
                        let mut matched = false;
                        for (idx, matcher) in inner.iter().enumerate() {
                            if used[idx] {
                                continue;
                            }
                            if matcher.matches(item)? {
                                used[idx] = true;
                                matched = true;
                                break;
                            }
                        }
                        if !matched {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                CombinatorOp::HaveLength => {
                    let length = match actual {
                        Value::String(s) => s.chars().count(),
                        Value::Array(a) => a.len(),
                        _ => return Ok(false),
                    };
                    let length = Value::from(length as u64);
                    for matcher in inner {
                        if !matcher.matches(&length)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
            },
        }
    }
}

/// Equality with mixed-representation numbers compared numerically
fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => match (e.as_f64(), a.as_f64()) {
            (Some(e), Some(a)) => e == a,
            _ => expected == actual,
        },
        _ => expected == actual,
    }
}

/// Order actual against expected; numbers numerically, strings
/// lexicographically, anything else is a type fault
fn compare(actual: &Value, expected: &Value) -> Result<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(e)) => {
            match (a.as_f64(), e.as_f64()) {
                (Some(a), Some(e)) => a
                    .partial_cmp(&e)
                    .ok_or_else(|| Error::Evaluation("numbers are not comparable".into())),
                _ => Err(Error::Evaluation("numbers are not comparable".into())),
            }
        }
        (Value::String(a), Value::String(e)) => Ok(a.as_str().cmp(e.as_str())),
        _ => Err(Error::Evaluation(format!(
            "cannot order {} against {}",
            type_label(actual),
            type_label(expected)
        ))),
    }
}

fn as_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| type_fault("a string", value))
}

fn as_instant(value: &Value) -> Result<OffsetDateTime> {
    let text = as_str(value)?;
    OffsetDateTime::parse(text, &Rfc3339)
        .map_err(|e| Error::Evaluation(format!("not an RFC 3339 datetime: {}: {}", text, e)))
}

fn type_fault(expected: &str, actual: &Value) -> Error {
    Error::Evaluation(format!("expected {}, but was {}", expected, type_label(actual)))
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Static(op) => {
                let phrase = match op {
                    StaticOp::Anything => "be anything",
                    StaticOp::BeNull => "be null",
                    StaticOp::BeEmpty => "be empty",
                };
                write!(f, "{}", phrase)
            }
            Matcher::Value(op, value) => {
                let phrase = match op {
                    ValueOp::Equal => "equal",
                    ValueOp::BeGreaterThan => "be greater than",
                    ValueOp::BeGreaterThanOrEqualTo => "be greater than or equal to",
                    ValueOp::BeLessThan => "be less than",
                    ValueOp::BeLessThanOrEqualTo => "be less than or equal to",
                    ValueOp::ContainString => "contain string",
                    ValueOp::StartWith => "start with",
                    ValueOp::EndWith => "end with",
                    ValueOp::MatchRegex => "match regex",
                    ValueOp::BeBefore => "be before",
                    ValueOp::BeAfter => "be after",
                };
                write!(f, "{} {}", phrase, value)
            }
            Matcher::Combined(op, inner) => {
                let phrase = match op {
                    CombinatorOp::Not => "not",
                    CombinatorOp::AllOf => "all of",
                    CombinatorOp::AnyOf => "any of",
                    CombinatorOp::HaveItem => "have an item that",
                    CombinatorOp::HaveItems => "have items that",
                    CombinatorOp::ContainExactly => "contain exactly",
                    CombinatorOp::ContainInAnyOrder => "contain in any order",
                    CombinatorOp::HaveLength => "have a length that",
                };
                write!(f, "{} (", phrase)?;
                for (idx, matcher) in inner.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", matcher)?;
                }
                write!(f, ")")
            }
        }
    }
}
