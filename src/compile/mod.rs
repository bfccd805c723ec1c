//! YAML scenario compilation
//!
//! Turns scenario documents into the runnable engine types. Compilation
//! happens entirely up front: a document either becomes a valid
//! [`Scenario`] or fails with an error naming the offending node, rendered
//! like `.cases[0].response.body[1]`.
//!
//! Two tags extend plain YAML: `!argument <name>` substitutes a named CLI
//! argument (null when absent), and `!relative_datetime <expr>` embeds a
//! datetime resolved against the running context's origin.

mod description;
mod matcher;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_yaml::{Mapping, Value};

use crate::common::{Error, Result};
use crate::context::BoundValue;
use crate::http::{Method, ParamValue, Request};
use crate::run::{Case, Scenario};
use crate::verify::ResponseDescription;

/// Named CLI arguments, injectable into documents via `!argument` tags
pub type Arguments = HashMap<String, Value>;

/// Compile one scenario document
pub fn compile_str(source: &str, arguments: &Arguments) -> Result<Scenario> {
    let document: Value = serde_yaml::from_str(source)?;
    let document = inject_arguments(document, arguments)?;
    compile_scenario(&document)
}

/// Read and compile one scenario file
pub fn compile_file(path: &Path, arguments: &Arguments) -> Result<Scenario> {
    let source = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    compile_str(&source, arguments)
}

/// Replace every `!argument <name>` node with the named argument's value;
/// a missing argument substitutes null
fn inject_arguments(value: Value, arguments: &Arguments) -> Result<Value> {
    match value {
        Value::Tagged(tagged) if tagged.tag == "argument" => {
            let Value::String(name) = tagged.value else {
                return Err(Error::compile("argument names must be strings"));
            };
            Ok(arguments.get(&name).cloned().unwrap_or(Value::Null))
        }
        Value::Tagged(mut tagged) => {
            tagged.value = inject_arguments(tagged.value, arguments)?;
            Ok(Value::Tagged(tagged))
        }
        Value::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| inject_arguments(item, arguments).map_err(|e| e.at_index(idx)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut injected = Mapping::with_capacity(map.len());
            for (key, item) in map {
                let item = inject_arguments(item, arguments)
                    .map_err(|e| e.at_key(key.as_str().unwrap_or("?")))?;
                injected.insert(key, item);
            }
            Ok(Value::Mapping(injected))
        }
        scalar => Ok(scalar),
    }
}

fn compile_scenario(value: &Value) -> Result<Scenario> {
    let map = mapping_of(value)?;
    let conditions = match field(map, "when") {
        Some(value) => description::compile_descriptions(value).map_err(|e| e.at_key("when"))?,
        None => Vec::new(),
    };
    Ok(Scenario {
        label: opt_string(map, "label")?,
        ordered: opt_bool(map, "ordered")?.unwrap_or(true),
        conditions,
        cases: compile_seq(map, "cases", compile_case)?,
        subscenarios: compile_seq(map, "subscenarios", compile_scenario)?,
    })
}

fn compile_case(value: &Value) -> Result<Case> {
    let map = mapping_of(value)?;
    let conditions = match field(map, "when") {
        Some(value) => description::compile_descriptions(value).map_err(|e| e.at_key("when"))?,
        None => Vec::new(),
    };
    let request = match field(map, "request") {
        Some(value) => compile_request(value).map_err(|e| e.at_key("request"))?,
        None => Request::default(),
    };
    let response = match field(map, "response") {
        Some(value) => description::compile_response(value).map_err(|e| e.at_key("response"))?,
        None => ResponseDescription::default(),
    };
    Ok(Case {
        label: opt_string(map, "label")?,
        enabled: opt_bool(map, "enabled")?.unwrap_or(true),
        conditions,
        wait: compile_wait(map)?,
        request,
        response,
    })
}

fn compile_wait(map: &Mapping) -> Result<Option<Duration>> {
    let Some(value) = field(map, "wait") else {
        return Ok(None);
    };
    let seconds = value
        .as_f64()
        .ok_or_else(|| Error::compile("must be a number").at_key("wait"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::compile("must be a non-negative number").at_key("wait"));
    }
    Ok(Some(Duration::from_secs_f64(seconds)))
}

/// Compile a request node: a bare string is the request path
fn compile_request(value: &Value) -> Result<Request> {
    if let Some(path) = value.as_str() {
        return Ok(Request {
            path: path.to_string(),
            ..Request::default()
        });
    }
    let map = mapping_of(value)?;
    let method = match field(map, "method") {
        Some(value) => str_of(value)
            .and_then(|text| text.parse::<Method>())
            .map_err(|e| e.at_key("method"))?,
        None => Method::Get,
    };
    let path = match field(map, "path") {
        Some(value) => str_of(value).map_err(|e| e.at_key("path"))?.to_string(),
        None => "/".to_string(),
    };
    let headers = match field(map, "headers") {
        Some(value) => compile_headers(value).map_err(|e| e.at_key("headers"))?,
        None => Vec::new(),
    };
    let params = match field(map, "params") {
        Some(value) => compile_params(value).map_err(|e| e.at_key("params"))?,
        None => Vec::new(),
    };
    let body = match field(map, "body") {
        Some(value) => Some(yaml_to_json(value).map_err(|e| e.at_key("body"))?),
        None => None,
    };
    Ok(Request {
        method,
        path,
        headers,
        params,
        body,
    })
}

fn compile_headers(value: &Value) -> Result<Vec<(String, String)>> {
    let map = mapping_of(value)?;
    let mut headers = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key
            .as_str()
            .ok_or_else(|| Error::compile("header names must be strings"))?;
        let value = str_of(value).map_err(|e| e.at_key(name))?;
        headers.push((name.to_string(), value.to_string()));
    }
    Ok(headers)
}

fn compile_params(value: &Value) -> Result<Vec<(String, ParamValue)>> {
    let map = mapping_of(value)?;
    let mut params = Vec::with_capacity(map.len());
    for (key, value) in map {
        let name = key
            .as_str()
            .ok_or_else(|| Error::compile("parameter names must be strings"))?;
        let value = compile_param_value(value).map_err(|e| e.at_key(name))?;
        params.push((name.to_string(), value));
    }
    Ok(params)
}

/// A parameter is one scalar or a list of scalars, each possibly a
/// relative datetime
fn compile_param_value(value: &Value) -> Result<ParamValue> {
    if let Some(items) = value.as_sequence() {
        let values = items
            .iter()
            .enumerate()
            .map(|(idx, item)| compile_param_scalar(item).map_err(|e| e.at_index(idx)))
            .collect::<Result<Vec<_>>>()?;
        return Ok(ParamValue::List(values));
    }
    compile_param_scalar(value).map(ParamValue::Scalar)
}

fn compile_param_scalar(value: &Value) -> Result<BoundValue> {
    let bound = compile_bound(value)?;
    if let BoundValue::Literal(literal) = &bound {
        if literal.is_array() || literal.is_object() {
            return Err(Error::compile("must be a scalar"));
        }
    }
    Ok(bound)
}

/// Compile a value that may carry a `!relative_datetime` tag; everything
/// else becomes a JSON literal
fn compile_bound(value: &Value) -> Result<BoundValue> {
    if let Value::Tagged(tagged) = value {
        if tagged.tag == "relative_datetime" {
            let text = tagged
                .value
                .as_str()
                .ok_or_else(|| Error::compile("must be a string"))?;
            return Ok(BoundValue::Relative(text.parse()?));
        }
        return Err(Error::compile(format!("unknown tag: {}", tagged.tag)));
    }
    Ok(BoundValue::Literal(yaml_to_json(value)?))
}

/// JSON rendition of a YAML node. Only scalars, sequences, and
/// string-keyed mappings survive; tags must have been resolved already.
fn yaml_to_json(value: &Value) -> Result<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => {
            if let Some(n) = n.as_i64() {
                Ok(serde_json::Value::from(n))
            } else if let Some(n) = n.as_u64() {
                Ok(serde_json::Value::from(n))
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| Error::compile("must be a finite number"))
            }
        }
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Sequence(items) => {
            let items = items
                .iter()
                .enumerate()
                .map(|(idx, item)| yaml_to_json(item).map_err(|e| e.at_index(idx)))
                .collect::<Result<Vec<_>>>()?;
            Ok(serde_json::Value::Array(items))
        }
        Value::Mapping(map) => {
            let mut object = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                let key = key
                    .as_str()
                    .ok_or_else(|| Error::compile("mapping keys must be strings"))?;
                let item = yaml_to_json(item).map_err(|e| e.at_key(key))?;
                object.insert(key.to_string(), item);
            }
            Ok(serde_json::Value::Object(object))
        }
        Value::Tagged(tagged) => Err(Error::compile(format!("unexpected tag: {}", tagged.tag))),
    }
}

fn mapping_of(value: &Value) -> Result<&Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| Error::compile("must be a mapping"))
}

fn str_of(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| Error::compile("must be a string"))
}

/// Look a key up, treating an explicit null (e.g. an unset argument) as
/// absent
fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    match map.get(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

fn opt_string(map: &Mapping, key: &str) -> Result<Option<String>> {
    match field(map, key) {
        Some(value) => str_of(value)
            .map(|text| Some(text.to_string()))
            .map_err(|e| e.at_key(key)),
        None => Ok(None),
    }
}

fn opt_bool(map: &Mapping, key: &str) -> Result<Option<bool>> {
    match field(map, key) {
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| Error::compile("must be a boolean").at_key(key)),
        None => Ok(None),
    }
}

fn compile_seq<T>(
    map: &Mapping,
    key: &str,
    compile: impl Fn(&Value) -> Result<T>,
) -> Result<Vec<T>> {
    let Some(value) = field(map, key) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_sequence()
        .ok_or_else(|| Error::compile("must be a sequence").at_key(key))?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| compile(item).map_err(|e| e.at_index(idx).at_key(key)))
        .collect()
}
