//! Value extraction from analyzed response bodies

pub mod analyzer;
pub mod xml;

use serde::Deserialize;
use serde_json::Value;

use crate::common::{Error, Result};

pub use analyzer::{Analyzer, BodyFormat};
pub use xml::XmlDocument;

/// Optional scalar conversion applied to each matched value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cast {
    Int,
    Float,
    String,
}

impl Cast {
    fn apply(self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            Cast::Int => match &value {
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| cast_error("an integer", &value)),
                Value::Number(n) => n
                    .as_f64()
                    .map(|f| Value::from(f as i64))
                    .ok_or_else(|| cast_error("an integer", &value)),
                _ => Err(cast_error("an integer", &value)),
            },
            Cast::Float => match &value {
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| cast_error("a float", &value)),
                Value::Number(n) => n
                    .as_f64()
                    .map(Value::from)
                    .ok_or_else(|| cast_error("a float", &value)),
                _ => Err(cast_error("a float", &value)),
            },
            Cast::String => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(cast_error("a string", &other)),
            },
        }
    }
}

fn cast_error(target: &str, value: &Value) -> Error {
    Error::Extraction(format!("cannot cast {} to {}", value, target))
}

/// A compiled value extractor
///
/// Missing values yield null; malformed queries and capability mismatches
/// yield an extraction error that descriptions recover into a FAILURE
/// verification.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Dotted key path over JSON; numeric segments index arrays
    Key { path: String },
    /// JSONPath query over JSON
    JsonPath {
        query: String,
        multiple: bool,
        cast: Option<Cast>,
    },
    /// Restricted XPath query over XML
    XmlPath {
        query: String,
        multiple: bool,
        cast: Option<Cast>,
    },
}

impl Extractor {
    pub fn extract(&self, analyzer: &Analyzer) -> Result<Value> {
        match self {
            Extractor::Key { path } => Ok(lookup_key_path(analyzer.json()?, path)),
            Extractor::JsonPath {
                query,
                multiple,
                cast,
            } => {
                let matches = jsonpath_lib::select(analyzer.json()?, query)
                    .map_err(|_| Error::Extraction(format!("invalid JSONPath query: {}", query)))?;
                let values = matches.into_iter().cloned();
                collect(values, *multiple, *cast)
            }
            Extractor::XmlPath {
                query,
                multiple,
                cast,
            } => {
                let matches = analyzer.xml()?.select(query)?;
                let values = matches.into_iter().map(Value::String);
                collect(values, *multiple, *cast)
            }
        }
    }
}

fn collect<I>(values: I, multiple: bool, cast: Option<Cast>) -> Result<Value>
where
    I: Iterator<Item = Value>,
{
    let apply = |value: Value| match cast {
        Some(cast) => cast.apply(value),
        None => Ok(value),
    };
    if multiple {
        let values: Result<Vec<Value>> = values.map(apply).collect();
        Ok(Value::Array(values?))
    } else {
        match values.into_iter().next() {
            Some(value) => apply(value),
            None => Ok(Value::Null),
        }
    }
}

/// Walk a dotted path through objects and arrays; any missing step yields
/// null rather than an error
fn lookup_key_path(root: &Value, path: &str) -> Value {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(value) => value,
                None => return Value::Null,
            },
            Value::Array(items) => {
                match segment.parse::<usize>().ok().and_then(|idx| items.get(idx)) {
                    Some(value) => value,
                    None => return Value::Null,
                }
            }
            _ => return Value::Null,
        };
    }
    current.clone()
}
