//! Response requirements

use serde_json::Value;

use super::description::Description;
use super::predicate::Predicate;
use super::status::Status;
use super::verification::Verification;
use crate::common::Result;
use crate::context::Context;
use crate::extract::{Analyzer, BodyFormat};
use crate::http::Response;

/// Checks applied to a response body, parsed per the declared format
#[derive(Debug, Clone)]
pub struct BodyDescription {
    format: BodyFormat,
    descriptions: Vec<Description>,
}

impl BodyDescription {
    pub fn new(format: BodyFormat, descriptions: Vec<Description>) -> Self {
        Self {
            format,
            descriptions,
        }
    }

    /// Nothing declared verifies as SKIPPED; a body that fails to parse is
    /// a FAILURE and the descriptions are not consulted.
    pub fn verify(&self, body: &str, context: &Context) -> Result<Verification> {
        if self.descriptions.is_empty() {
            return Ok(Verification::skipped());
        }
        let analyzer = match Analyzer::parse(self.format, body) {
            Ok(analyzer) => analyzer,
            Err(error) => return Ok(Verification::of_error(&error)),
        };
        let mut children = Vec::with_capacity(self.descriptions.len());
        for description in &self.descriptions {
            children.push(description.verify(&analyzer, context)?);
        }
        Ok(Verification::collect(children))
    }
}

/// The full requirement set for one response
#[derive(Debug, Clone, Default)]
pub struct ResponseDescription {
    status_code: Vec<Predicate>,
    headers: Vec<Description>,
    body: Option<BodyDescription>,
}

impl ResponseDescription {
    pub fn new(
        status_code: Vec<Predicate>,
        headers: Vec<Description>,
        body: Option<BodyDescription>,
    ) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn verify(&self, response: &Response, context: &Context) -> Result<ResponseVerification> {
        let status_code = self.verify_status_code(response.status, context)?;
        let headers = self.verify_headers(&response.headers, context)?;
        let body = match &self.body {
            Some(body) => body.verify(&response.body, context)?,
            None => Verification::skipped(),
        };
        let status = Status::merge_all([status_code.status, headers.status, body.status]);
        Ok(ResponseVerification {
            status,
            status_code,
            headers,
            body,
        })
    }

    fn verify_status_code(&self, code: u16, context: &Context) -> Result<Verification> {
        let actual = Value::from(code);
        let mut children = Vec::with_capacity(self.status_code.len());
        for predicate in &self.status_code {
            children.push(predicate.verify(&actual, context)?);
        }
        Ok(Verification::collect(children))
    }

    fn verify_headers(
        &self,
        headers: &[(String, String)],
        context: &Context,
    ) -> Result<Verification> {
        if self.headers.is_empty() {
            return Ok(Verification::skipped());
        }
        let analyzer = Analyzer::from(header_view(headers));
        let mut children = Vec::with_capacity(self.headers.len());
        for description in &self.headers {
            children.push(description.verify(&analyzer, context)?);
        }
        Ok(Verification::collect(children))
    }
}

/// Header view for descriptions: lower-cased names mapping to values
fn header_view(headers: &[(String, String)]) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        map.insert(name.to_ascii_lowercase(), Value::String(value.clone()));
    }
    Value::Object(map)
}

/// Verification of one response, split by part
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResponseVerification {
    pub status: Status,
    pub status_code: Verification,
    pub headers: Verification,
    pub body: Verification,
}
