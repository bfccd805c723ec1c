//! Value-resolution context
//!
//! Matchers and request templates may embed context-dependent values, the
//! main one being relative datetimes ("2 hours", "-1 day") resolved against
//! the origin instant of the running scenario or attempt. The context also
//! carries named values that scenario preconditions can query.

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::common::{Error, Result};

/// Format an instant as RFC 3339, the engine's text form for datetimes
pub fn format_rfc3339(instant: OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| instant.to_string())
}

/// Resolution environment threaded through matching, extraction, and
/// request preparation. Read-only once built; concurrent children share it
/// by reference.
#[derive(Debug, Clone)]
pub struct Context {
    origin: OffsetDateTime,
    values: HashMap<String, Value>,
}

impl Context {
    /// Create a context originating at the given instant
    pub fn new(origin: OffsetDateTime) -> Self {
        Self {
            origin,
            values: HashMap::new(),
        }
    }

    /// Create a context originating now
    pub fn now() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }

    /// Add a named value queryable by precondition descriptions
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn origin(&self) -> OffsetDateTime {
        self.origin
    }

    /// The same values rebased to a new origin (one per retry attempt)
    pub fn with_origin(&self, origin: OffsetDateTime) -> Self {
        Self {
            origin,
            values: self.values.clone(),
        }
    }

    /// JSON view of the context for precondition checks: the named values
    /// plus the origin under `starts`
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.values {
            map.insert(key.clone(), value.clone());
        }
        map.insert("starts".into(), Value::String(format_rfc3339(self.origin)));
        Value::Object(map)
    }
}

/// A signed offset from the context origin, written `now` or `[+|-]N unit`
/// with unit day/hour/minute/second (optionally plural, case-insensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTime {
    delta: Duration,
}

impl RelativeTime {
    pub fn resolve(&self, origin: OffsetDateTime) -> OffsetDateTime {
        origin + self.delta
    }
}

impl FromStr for RelativeTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.eq_ignore_ascii_case("now") {
            return Ok(Self {
                delta: Duration::ZERO,
            });
        }

        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let rest = rest.trim_start();
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, unit) = rest.split_at(digits_end);
        let count: i64 = digits.parse().map_err(|_| invalid_relative_time(s))?;

        let per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => 86_400,
            "hour" | "hours" => 3_600,
            "minute" | "minutes" => 60,
            "second" | "seconds" => 1,
            _ => return Err(invalid_relative_time(s)),
        };
        let seconds = count
            .checked_mul(per_unit)
            .ok_or_else(|| invalid_relative_time(s))?;
        let seconds = if negative { -seconds } else { seconds };

        Ok(Self {
            delta: Duration::seconds(seconds),
        })
    }
}

fn invalid_relative_time(value: &str) -> Error {
    Error::compile(format!("invalid relative time: {}", value))
}

/// A value embedded in a compiled matcher or request template: a literal,
/// or a relative time resolved against the context origin at use time
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Literal(Value),
    Relative(RelativeTime),
}

impl BoundValue {
    /// Resolve against the context; relative times become RFC 3339 strings
    pub fn resolve(&self, context: &Context) -> Value {
        match self {
            BoundValue::Literal(value) => value.clone(),
            BoundValue::Relative(relative) => {
                Value::String(format_rfc3339(relative.resolve(context.origin())))
            }
        }
    }
}

impl From<Value> for BoundValue {
    fn from(value: Value) -> Self {
        BoundValue::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origin() -> OffsetDateTime {
        OffsetDateTime::parse("2021-01-23T12:00:00Z", &Rfc3339).unwrap()
    }

    fn parse(text: &str) -> RelativeTime {
        text.parse().unwrap()
    }

    #[test]
    fn test_relative_time_grammar() {
        let base = origin();
        let cases: &[(&str, i64)] = &[
            ("now", 0),
            ("0day", 0),
            ("1day", 86_400),
            ("2 DaYs", 2 * 86_400),
            ("+365 days", 365 * 86_400),
            ("  -1  days ", -86_400),
            ("24 hours", 24 * 3_600),
            ("-120 minutes", -120 * 60),
            ("+60 seconds", 60),
        ];
        for (text, seconds) in cases {
            let resolved = parse(text).resolve(base);
            assert_eq!(
                (resolved - base).whole_seconds(),
                *seconds,
                "parsing {:?}",
                text
            );
        }
    }

    #[test]
    fn test_relative_time_rejects_garbage() {
        for text in ["invalid", "now +1 day", "1", "1 fortnight", "", "+ day"] {
            assert!(
                text.parse::<RelativeTime>().is_err(),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_bound_value_resolution() {
        let context = Context::new(origin());

        let literal = BoundValue::Literal(json!({"answer": 42}));
        assert_eq!(literal.resolve(&context), json!({"answer": 42}));

        let relative = BoundValue::Relative(parse("-1 hour"));
        assert_eq!(
            relative.resolve(&context),
            json!("2021-01-23T11:00:00Z")
        );
    }

    #[test]
    fn test_context_json_view_exposes_values_and_starts() {
        let context = Context::new(origin())
            .with_value("base_url", "http://localhost:8080")
            .with_value("attempt", 3);
        let view = context.to_json();
        assert_eq!(view["base_url"], json!("http://localhost:8080"));
        assert_eq!(view["attempt"], json!(3));
        assert_eq!(view["starts"], json!("2021-01-23T12:00:00Z"));
    }

    #[test]
    fn test_with_origin_keeps_values() {
        let context = Context::new(origin()).with_value("key", "value");
        let rebased = context.with_origin(origin() + Duration::hours(1));
        assert_eq!(rebased.to_json()["key"], json!("value"));
        assert_eq!(
            rebased.to_json()["starts"],
            json!("2021-01-23T13:00:00Z")
        );
    }
}
