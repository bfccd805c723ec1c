//! Predicate expression compilation
//!
//! The `should` grammar: a scalar compiles to an equality check (strings
//! naming a parameterless matcher compile to that matcher), a single-key
//! mapping compiles to the operator named by the key, and combinator
//! operands compile recursively. Regex patterns are checked here so that a
//! bad pattern fails the document, not the run.

use regex::Regex;
use serde_yaml::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::{compile_bound, str_of};
use crate::common::{Error, Result};
use crate::context::{BoundValue, RelativeTime};
use crate::verify::{CombinatorOp, MatcherFactory, Predicate, StaticOp, ValueOp};

/// Compile a `should` node: one expression or a sequence of them
pub(super) fn compile_predicates(value: &Value) -> Result<Vec<Predicate>> {
    match value.as_sequence() {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| compile_predicate(item).map_err(|e| e.at_index(idx)))
            .collect(),
        None => Ok(vec![compile_predicate(value)?]),
    }
}

fn compile_predicate(value: &Value) -> Result<Predicate> {
    compile_factory(value).map(Predicate::new)
}

fn compile_factory(value: &Value) -> Result<MatcherFactory> {
    match value {
        Value::String(name) => Ok(compile_name(name)),
        Value::Mapping(map) => {
            let mut entries = map.iter();
            let (Some((key, operand)), None) = (entries.next(), entries.next()) else {
                return Err(Error::compile("a matcher takes exactly one key"));
            };
            let name = key
                .as_str()
                .ok_or_else(|| Error::compile("matcher names must be strings"))?;
            compile_operator(name, operand)
        }
        // Anything else, tagged relative datetimes included, is an equality
        // literal.
        literal => Ok(MatcherFactory::Value(ValueOp::Equal, compile_bound(literal)?)),
    }
}

/// Parameterless matchers selectable by name; any other string is an
/// equality literal
fn compile_name(name: &str) -> MatcherFactory {
    match name {
        "anything" => MatcherFactory::Static(StaticOp::Anything),
        "be_null" => MatcherFactory::Static(StaticOp::BeNull),
        "be_empty" => MatcherFactory::Static(StaticOp::BeEmpty),
        literal => MatcherFactory::Value(
            ValueOp::Equal,
            BoundValue::Literal(serde_json::Value::String(literal.to_string())),
        ),
    }
}

fn compile_operator(name: &str, operand: &Value) -> Result<MatcherFactory> {
    let compiled = match name {
        "equal" => value_op(ValueOp::Equal, operand),
        "be_greater_than" => value_op(ValueOp::BeGreaterThan, operand),
        "be_greater_than_or_equal_to" => value_op(ValueOp::BeGreaterThanOrEqualTo, operand),
        "be_less_than" => value_op(ValueOp::BeLessThan, operand),
        "be_less_than_or_equal_to" => value_op(ValueOp::BeLessThanOrEqualTo, operand),
        "contain_string" => string_op(ValueOp::ContainString, operand),
        "start_with" => string_op(ValueOp::StartWith, operand),
        "end_with" => string_op(ValueOp::EndWith, operand),
        "match_regex" => regex_op(operand),
        "be_before" => instant_op(ValueOp::BeBefore, operand),
        "be_after" => instant_op(ValueOp::BeAfter, operand),
        "not" => combinator(CombinatorOp::Not, single(operand)),
        "all_of" => combinator(CombinatorOp::AllOf, sequence(operand)),
        "any_of" => combinator(CombinatorOp::AnyOf, sequence(operand)),
        "have_item" => combinator(CombinatorOp::HaveItem, single(operand)),
        "have_items" => combinator(CombinatorOp::HaveItems, one_or_many(operand)),
        "contain_exactly" => combinator(CombinatorOp::ContainExactly, one_or_many(operand)),
        "contain_in_any_order" => combinator(CombinatorOp::ContainInAnyOrder, one_or_many(operand)),
        "have_length" => combinator(CombinatorOp::HaveLength, single(operand)),
        unknown => return Err(Error::compile(format!("unknown matcher: {}", unknown))),
    };
    compiled.map_err(|e| e.at_key(name))
}

fn value_op(op: ValueOp, operand: &Value) -> Result<MatcherFactory> {
    Ok(MatcherFactory::Value(op, compile_bound(operand)?))
}

fn instant_op(op: ValueOp, operand: &Value) -> Result<MatcherFactory> {
    Ok(MatcherFactory::Value(op, compile_instant(operand)?))
}

fn combinator(op: CombinatorOp, inner: Result<Vec<MatcherFactory>>) -> Result<MatcherFactory> {
    inner.map(|inner| MatcherFactory::Recursive(op, inner))
}

/// String matchers reject non-string operands at compile time; a relative
/// datetime passes since it resolves to a string
fn string_op(op: ValueOp, operand: &Value) -> Result<MatcherFactory> {
    let bound = compile_bound(operand)?;
    if let BoundValue::Literal(literal) = &bound {
        if !literal.is_string() {
            return Err(Error::compile("must be a string"));
        }
    }
    Ok(MatcherFactory::Value(op, bound))
}

fn regex_op(operand: &Value) -> Result<MatcherFactory> {
    let pattern = str_of(operand)?;
    Regex::new(pattern).map_err(|e| Error::compile(format!("invalid regex: {}", e)))?;
    Ok(MatcherFactory::Value(
        ValueOp::MatchRegex,
        BoundValue::Literal(serde_json::Value::String(pattern.to_string())),
    ))
}

/// A temporal operand: a relative time (`now`, `-1 day`) or an RFC 3339
/// literal
fn compile_instant(operand: &Value) -> Result<BoundValue> {
    if let Value::Tagged(_) = operand {
        return compile_bound(operand);
    }
    let text = str_of(operand)?;
    if let Ok(relative) = text.parse::<RelativeTime>() {
        return Ok(BoundValue::Relative(relative));
    }
    OffsetDateTime::parse(text, &Rfc3339)
        .map_err(|_| Error::compile(format!("not a datetime: {}", text)))?;
    Ok(BoundValue::Literal(serde_json::Value::String(
        text.to_string(),
    )))
}

fn single(operand: &Value) -> Result<Vec<MatcherFactory>> {
    Ok(vec![compile_factory(operand)?])
}

fn sequence(operand: &Value) -> Result<Vec<MatcherFactory>> {
    let items = operand
        .as_sequence()
        .ok_or_else(|| Error::compile("must be a sequence"))?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| compile_factory(item).map_err(|e| e.at_index(idx)))
        .collect()
}

fn one_or_many(operand: &Value) -> Result<Vec<MatcherFactory>> {
    if operand.is_sequence() {
        sequence(operand)
    } else {
        single(operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use serde_json::json;

    fn context() -> Context {
        Context::new(OffsetDateTime::parse("2021-01-23T12:00:00Z", &Rfc3339).unwrap())
    }

    fn factory(source: &str) -> MatcherFactory {
        compile_factory(&serde_yaml::from_str(source).unwrap()).unwrap()
    }

    fn check(source: &str, actual: serde_json::Value) -> bool {
        factory(source).create(&context()).matches(&actual).unwrap()
    }

    fn compile_error(source: &str) -> String {
        compile_factory(&serde_yaml::from_str(source).unwrap())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_scalars_compile_to_equality() {
        assert!(check("1", json!(1)));
        assert!(!check("1", json!(2)));
        assert!(check("1.5", json!(1.5)));
        assert!(check("true", json!(true)));
        assert!(check("~", json!(null)));
        assert!(check("plain text", json!("plain text")));
        assert!(!check("plain text", json!("other")));
    }

    #[test]
    fn test_matcher_names_compile_to_static_matchers() {
        assert!(check("be_null", json!(null)));
        assert!(!check("be_null", json!(0)));
        assert!(check("be_empty", json!([])));
        assert!(check("anything", json!({"any": "thing"})));
        // An unreserved string is an equality literal, not a matcher.
        assert!(check("be_quick", json!("be_quick")));
    }

    #[test]
    fn test_value_operators() {
        assert!(check("equal: 42", json!(42)));
        assert!(check("equal: [1, 2]", json!([1, 2])));
        assert!(check("be_greater_than: 2", json!(3)));
        assert!(!check("be_greater_than: 2", json!(2)));
        assert!(check("be_greater_than_or_equal_to: 2", json!(2)));
        assert!(check("be_less_than: 2", json!(1)));
        assert!(check("be_less_than_or_equal_to: 2", json!(2)));
    }

    #[test]
    fn test_string_operators() {
        assert!(check("contain_string: lo wo", json!("hello world")));
        assert!(!check("contain_string: lo wo", json!("goodbye")));
        assert!(check("start_with: hel", json!("hello")));
        assert!(check("end_with: llo", json!("hello")));
    }

    #[test]
    fn test_string_operands_are_checked_at_compile_time() {
        assert_eq!(
            compile_error("contain_string: 1"),
            "must be a string: .contain_string"
        );
        assert_eq!(compile_error("start_with: [a]"), "must be a string: .start_with");
    }

    #[test]
    fn test_regex_patterns_are_validated_at_compile_time() {
        assert!(check("match_regex: '^v[0-9]+$'", json!("v12")));
        assert!(!check("match_regex: '^v[0-9]+$'", json!("v12-beta")));

        let error = compile_error("match_regex: '['");
        assert!(error.starts_with("invalid regex"), "got {:?}", error);
        assert!(error.ends_with(": .match_regex"), "got {:?}", error);

        assert_eq!(compile_error("match_regex: 1"), "must be a string: .match_regex");
    }

    #[test]
    fn test_temporal_operands_parse_as_relative_or_rfc3339() {
        // The context originates at 2021-01-23T12:00:00Z.
        assert!(check("be_before: now", json!("2021-01-23T11:00:00Z")));
        assert!(!check("be_before: now", json!("2021-01-23T13:00:00Z")));
        assert!(check("be_after: -2 hours", json!("2021-01-23T11:00:00Z")));
        assert!(check("be_before: 2021-02-01T00:00:00Z", json!("2021-01-30T00:00:00Z")));

        assert_eq!(
            compile_error("be_before: five o'clock"),
            "not a datetime: five o'clock: .be_before"
        );
        assert_eq!(compile_error("be_after: 123"), "must be a string: .be_after");
    }

    #[test]
    fn test_tagged_relative_datetimes_compile_into_operands() {
        assert!(check(
            "equal: !relative_datetime 1 hour",
            json!("2021-01-23T13:00:00Z")
        ));
        assert!(check(
            "be_before: !relative_datetime -1 day",
            json!("2021-01-20T00:00:00Z")
        ));
    }

    #[test]
    fn test_not_and_boolean_combinators() {
        assert!(check("not: 1", json!(2)));
        assert!(!check("not: 1", json!(1)));
        assert!(check("not: be_null", json!(0)));

        assert!(check(
            "all_of: [{be_greater_than: 1}, {be_less_than: 3}]",
            json!(2)
        ));
        assert!(!check(
            "all_of: [{be_greater_than: 1}, {be_less_than: 3}]",
            json!(3)
        ));
        assert!(check("any_of: [a, b]", json!("b")));
        assert!(!check("any_of: [a, b]", json!("c")));
    }

    #[test]
    fn test_boolean_combinators_require_sequences() {
        assert_eq!(compile_error("all_of: 1"), "must be a sequence: .all_of");
        assert_eq!(compile_error("any_of: {equal: 1}"), "must be a sequence: .any_of");
    }

    #[test]
    fn test_sequence_combinators() {
        assert!(check("have_item: {be_greater_than: 2}", json!([1, 2, 3])));
        assert!(!check("have_item: {be_greater_than: 2}", json!([1, 2])));

        // These accept a single expression or a sequence of them.
        assert!(check("have_items: 2", json!([1, 2])));
        assert!(check("have_items: [1, 3]", json!([3, 2, 1])));
        assert!(!check("have_items: [1, 4]", json!([3, 2, 1])));

        assert!(check("contain_exactly: [1, 2]", json!([1, 2])));
        assert!(!check("contain_exactly: [1, 2]", json!([2, 1])));
        assert!(check("contain_in_any_order: [1, 2]", json!([2, 1])));

        assert!(check("have_length: 3", json!([1, 2, 3])));
        assert!(check("have_length: {be_less_than: 3}", json!("ab")));
    }

    #[test]
    fn test_combinators_compile_recursively() {
        let source = "not: {have_item: {all_of: [{be_greater_than: 10}, {be_less_than: 20}]}}";
        assert!(check(source, json!([1, 30])));
        assert!(!check(source, json!([1, 15])));
    }

    #[test]
    fn test_unknown_matchers_are_rejected() {
        assert_eq!(compile_error("be_pink: 1"), "unknown matcher: be_pink");
    }

    #[test]
    fn test_multi_key_mappings_are_rejected() {
        assert_eq!(
            compile_error("{equal: 1, not: 2}"),
            "a matcher takes exactly one key"
        );
    }

    #[test]
    fn test_nested_errors_carry_their_path() {
        assert_eq!(
            compile_error("all_of: [{equal: 1}, {contain_string: 2}]"),
            "must be a string: .all_of[1].contain_string"
        );
    }

    #[test]
    fn test_should_accepts_one_expression_or_a_sequence() {
        let one = compile_predicates(&serde_yaml::from_str("equal: 1").unwrap()).unwrap();
        assert_eq!(one.len(), 1);

        let many =
            compile_predicates(&serde_yaml::from_str("[be_null, {equal: 2}]").unwrap()).unwrap();
        assert_eq!(many.len(), 2);

        let error = compile_predicates(&serde_yaml::from_str("[{oops: 1}]").unwrap()).unwrap_err();
        assert_eq!(error.to_string(), "unknown matcher: oops: [0]");
    }
}
