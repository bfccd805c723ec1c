//! Description and response-requirement compilation
//!
//! A description is `describe` (an extraction), `should` (predicates), and
//! optionally `as` (a context value name). A bare string describes a
//! JSONPath query. Wherever a document takes descriptions, a single
//! mapping stands for a one-element list.

use serde_yaml::Value;

use super::matcher::compile_predicates;
use super::{field, mapping_of, opt_bool, str_of};
use crate::common::{Error, Result};
use crate::extract::{BodyFormat, Cast, Extractor};
use crate::verify::{BodyDescription, Description, ResponseDescription};

/// Compile a description node: one description or a sequence of them
pub(super) fn compile_descriptions(value: &Value) -> Result<Vec<Description>> {
    match value.as_sequence() {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| compile_description(item).map_err(|e| e.at_index(idx)))
            .collect(),
        None => Ok(vec![compile_description(value)?]),
    }
}

fn compile_description(value: &Value) -> Result<Description> {
    let map = mapping_of(value)?;
    let extractor = match field(map, "describe") {
        Some(value) => compile_extractor(value).map_err(|e| e.at_key("describe"))?,
        None => return Err(Error::compile("requires a `describe` key")),
    };
    let predicates = match field(map, "should") {
        Some(value) => compile_predicates(value).map_err(|e| e.at_key("should"))?,
        None => Vec::new(),
    };
    let name = match field(map, "as") {
        Some(value) => Some(str_of(value).map_err(|e| e.at_key("as"))?.to_string()),
        None => None,
    };
    Ok(Description::new(extractor, predicates, name))
}

fn compile_extractor(value: &Value) -> Result<Extractor> {
    if let Some(query) = value.as_str() {
        return Ok(Extractor::JsonPath {
            query: query.to_string(),
            multiple: false,
            cast: None,
        });
    }
    let map = mapping_of(value)?;
    let multiple = opt_bool(map, "multiple")?.unwrap_or(false);
    let cast = match field(map, "cast_to") {
        Some(value) => {
            let cast: Cast = serde_yaml::from_value(value.clone())
                .map_err(|e| Error::from(e).at_key("cast_to"))?;
            Some(cast)
        }
        None => None,
    };

    match (field(map, "jsonpath"), field(map, "key"), field(map, "xpath")) {
        (Some(query), None, None) => Ok(Extractor::JsonPath {
            query: str_of(query).map_err(|e| e.at_key("jsonpath"))?.to_string(),
            multiple,
            cast,
        }),
        (None, Some(path), None) => {
            if multiple || cast.is_some() {
                return Err(Error::compile(
                    "key extraction supports neither `multiple` nor `cast_to`",
                )
                .at_key("key"));
            }
            Ok(Extractor::Key {
                path: str_of(path).map_err(|e| e.at_key("key"))?.to_string(),
            })
        }
        (None, None, Some(query)) => Ok(Extractor::XmlPath {
            query: str_of(query).map_err(|e| e.at_key("xpath"))?.to_string(),
            multiple,
            cast,
        }),
        _ => Err(Error::compile(
            "requires exactly one of `jsonpath`, `key`, or `xpath`",
        )),
    }
}

/// Compile a case's `response` node
pub(super) fn compile_response(value: &Value) -> Result<ResponseDescription> {
    let map = mapping_of(value)?;
    let status_code = match field(map, "status_code") {
        Some(value) => compile_predicates(value).map_err(|e| e.at_key("status_code"))?,
        None => Vec::new(),
    };
    let headers = match field(map, "headers") {
        Some(value) => compile_descriptions(value).map_err(|e| e.at_key("headers"))?,
        None => Vec::new(),
    };
    let format = match field(map, "analyze_as") {
        Some(value) => serde_yaml::from_value(value.clone())
            .map_err(|e| Error::from(e).at_key("analyze_as"))?,
        None => BodyFormat::Json,
    };
    let body = match field(map, "body") {
        Some(value) => Some(BodyDescription::new(
            format,
            compile_descriptions(value).map_err(|e| e.at_key("body"))?,
        )),
        None => None,
    };
    Ok(ResponseDescription::new(status_code, headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::extract::Analyzer;
    use crate::http::Response;
    use crate::verify::{Status, Verification};
    use serde_json::json;

    fn description(source: &str) -> Description {
        compile_description(&serde_yaml::from_str(source).unwrap()).unwrap()
    }

    fn description_error(source: &str) -> String {
        compile_description(&serde_yaml::from_str(source).unwrap())
            .unwrap_err()
            .to_string()
    }

    fn verify_json(source: &str, body: serde_json::Value) -> Verification {
        description(source)
            .verify(&Analyzer::from(body), &Context::now())
            .unwrap()
    }

    #[test]
    fn test_a_bare_string_describes_a_jsonpath_query() {
        let verification = verify_json(
            r#"{describe: "$.foo", should: {equal: bar}}"#,
            json!({"foo": "bar"}),
        );
        assert_eq!(verification.status, Status::Success);
    }

    #[test]
    fn test_key_extraction() {
        let verification = verify_json(
            "describe: {key: nested.answer}\nshould: {equal: 42}",
            json!({"nested": {"answer": 42}}),
        );
        assert_eq!(verification.status, Status::Success);
    }

    #[test]
    fn test_jsonpath_with_multiple_and_cast() {
        let source = r#"
describe:
  jsonpath: "$.items[*].count"
  multiple: true
  cast_to: int
should:
  contain_exactly: [1, 2]
"#;
        let verification = verify_json(
            source,
            json!({"items": [{"count": "1"}, {"count": "2"}]}),
        );
        assert_eq!(verification.status, Status::Success);
    }

    #[test]
    fn test_xpath_extraction() {
        let source = r#"
describe: {xpath: /counts/n, multiple: true, cast_to: int}
should: {have_length: 3}
"#;
        let compiled = description(source);
        let analyzer =
            Analyzer::parse(BodyFormat::Xml, "<counts><n>1</n><n>2</n><n>3</n></counts>").unwrap();
        let verification = compiled.verify(&analyzer, &Context::now()).unwrap();
        assert_eq!(verification.status, Status::Success);
    }

    #[test]
    fn test_missing_should_compiles_to_a_skipped_check() {
        let verification = verify_json(r#"describe: "$.foo""#, json!({}));
        assert_eq!(verification.status, Status::Skipped);
    }

    #[test]
    fn test_as_names_the_verification() {
        let verification = verify_json(
            r#"{describe: "$.foo", should: {equal: 1}, as: the foo}"#,
            json!({"foo": 1}),
        );
        assert_eq!(verification.message.as_deref(), Some("the foo"));
    }

    #[test]
    fn test_describe_is_required() {
        assert_eq!(
            description_error("should: {equal: 1}"),
            "requires a `describe` key"
        );
    }

    #[test]
    fn test_exactly_one_extraction_kind() {
        let error = description_error(r#"describe: {jsonpath: "$.a", key: b}"#);
        assert_eq!(
            error,
            "requires exactly one of `jsonpath`, `key`, or `xpath`: .describe"
        );
        assert_eq!(
            description_error("describe: {multiple: true}"),
            "requires exactly one of `jsonpath`, `key`, or `xpath`: .describe"
        );
    }

    #[test]
    fn test_key_extraction_takes_no_options() {
        let error = description_error("describe: {key: foo, multiple: true}");
        assert_eq!(
            error,
            "key extraction supports neither `multiple` nor `cast_to`: .describe.key"
        );
    }

    #[test]
    fn test_unknown_casts_are_rejected() {
        let error = description_error(r#"describe: {jsonpath: "$.a", cast_to: integer}"#);
        assert!(error.contains("integer"), "got {:?}", error);
        assert!(error.ends_with(": .describe.cast_to"), "got {:?}", error);
    }

    fn response(source: &str) -> ResponseDescription {
        compile_response(&serde_yaml::from_str(source).unwrap()).unwrap()
    }

    fn http_response(status: u16, body: &str) -> Response {
        Response {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.into(),
        }
    }

    #[test]
    fn test_status_code_shorthand_is_an_equality() {
        let compiled = response("status_code: 200");
        let ok = compiled
            .verify(&http_response(200, ""), &Context::now())
            .unwrap();
        assert_eq!(ok.status, Status::Success);
        let wrong = compiled
            .verify(&http_response(503, ""), &Context::now())
            .unwrap();
        assert_eq!(wrong.status, Status::Failure);
    }

    #[test]
    fn test_status_code_accepts_full_predicates() {
        let compiled = response("status_code: {be_less_than: 300}");
        let ok = compiled
            .verify(&http_response(204, ""), &Context::now())
            .unwrap();
        assert_eq!(ok.status, Status::Success);
    }

    #[test]
    fn test_a_body_mapping_stands_for_one_description() {
        let compiled = response(r#"body: {describe: "$.count", should: {equal: 1}}"#);
        let verification = compiled
            .verify(&http_response(200, r#"{"count": 1}"#), &Context::now())
            .unwrap();
        assert_eq!(verification.status, Status::Success);
        assert_eq!(verification.body.children.len(), 1);
    }

    #[test]
    fn test_bodies_analyze_as_json_by_default_and_xml_on_request() {
        let compiled = response(
            "analyze_as: xml\nbody: {describe: {xpath: /root/item}, should: {equal: hello}}",
        );
        let verification = compiled
            .verify(
                &http_response(200, "<root><item>hello</item></root>"),
                &Context::now(),
            )
            .unwrap();
        assert_eq!(verification.status, Status::Success);

        let error = compile_response(&serde_yaml::from_str("analyze_as: html").unwrap())
            .unwrap_err()
            .to_string();
        assert!(error.ends_with(": .analyze_as"), "got {:?}", error);
    }

    #[test]
    fn test_header_descriptions_compile() {
        let compiled =
            response("headers: {describe: {key: content-type}, should: {contain_string: json}}");
        let verification = compiled
            .verify(&http_response(200, ""), &Context::now())
            .unwrap();
        assert_eq!(verification.headers.status, Status::Success);
    }

    #[test]
    fn test_body_errors_carry_their_index() {
        let source = r#"
body:
  - describe: "$.a"
  - should: {equal: 1}
"#;
        let error = compile_response(&serde_yaml::from_str(source).unwrap())
            .unwrap_err()
            .to_string();
        assert_eq!(error, "requires a `describe` key: .body[1]");
    }
}
