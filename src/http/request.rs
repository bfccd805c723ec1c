//! Request templates and their resolved, concrete form

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::common::Error;
use crate::context::{BoundValue, Context};

/// HTTP methods the engine issues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            other => Err(Error::compile(format!("unknown HTTP method: {}", other))),
        }
    }
}

/// One query parameter: a scalar or a list of scalars
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(BoundValue),
    List(Vec<BoundValue>),
}

/// A compiled request template. Context-bound parameter values resolve at
/// prepare time, right before the attempt.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, ParamValue)>,
    pub body: Option<Value>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: Method::Get,
            path: "/".into(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
        }
    }
}

impl Request {
    /// Resolve every context-bound value into a concrete request
    pub fn prepare(&self, context: &Context) -> PreparedRequest {
        let mut query = Vec::new();
        for (name, value) in &self.params {
            match value {
                ParamValue::Scalar(value) => push_param(&mut query, name, value, context),
                ParamValue::List(values) => {
                    for value in values {
                        push_param(&mut query, name, value, context);
                    }
                }
            }
        }
        PreparedRequest {
            method: self.method,
            path: self.path.clone(),
            headers: self.headers.clone(),
            query,
            body: self.body.clone(),
        }
    }
}

fn push_param(
    query: &mut Vec<(String, String)>,
    name: &str,
    value: &BoundValue,
    context: &Context,
) {
    if let Some(text) = format_param(&value.resolve(context)) {
        query.push((name.to_string(), text));
    }
}

/// Stringify one resolved parameter: null is omitted, booleans lowercase,
/// numbers decimal, strings (including resolved datetimes) as-is
fn format_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A fully resolved request, ready for the transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl fmt::Display for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (idx, (name, value)) in self.query.iter().enumerate() {
            let separator = if idx == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", separator, name, value)?;
        }
        Ok(())
    }
}
