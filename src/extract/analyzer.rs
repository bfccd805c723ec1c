//! Parsed response bodies

use serde::Deserialize;
use serde_json::Value;

use super::xml::XmlDocument;
use crate::common::{Error, Result};

/// Declared body format, chosen in the scenario definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Json,
    Xml,
    Text,
}

/// A parsed body exposing the structural queries its format supports
#[derive(Debug, Clone)]
pub enum Analyzer {
    Json(Value),
    Xml(XmlDocument),
    Text(String),
}

impl Analyzer {
    /// Parse a body according to its declared format
    pub fn parse(format: BodyFormat, body: &str) -> Result<Self> {
        match format {
            BodyFormat::Json => serde_json::from_str(body)
                .map(Analyzer::Json)
                .map_err(|e| Error::Analysis(format!("invalid JSON body: {}", e))),
            BodyFormat::Xml => XmlDocument::parse(body).map(Analyzer::Xml),
            BodyFormat::Text => Ok(Analyzer::Text(body.to_string())),
        }
    }

    pub(super) fn json(&self) -> Result<&Value> {
        match self {
            Analyzer::Json(value) => Ok(value),
            other => Err(Error::Extraction(format!(
                "cannot run a JSON query over a {} body",
                other.kind()
            ))),
        }
    }

    pub(super) fn xml(&self) -> Result<&XmlDocument> {
        match self {
            Analyzer::Xml(document) => Ok(document),
            other => Err(Error::Extraction(format!(
                "cannot run an XPath query over a {} body",
                other.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Analyzer::Json(_) => "JSON",
            Analyzer::Xml(_) => "XML",
            Analyzer::Text(_) => "text",
        }
    }
}

impl From<Value> for Analyzer {
    fn from(value: Value) -> Self {
        Analyzer::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_by_declared_format() {
        let json = Analyzer::parse(BodyFormat::Json, r#"{"answer": 42}"#).unwrap();
        assert!(matches!(json, Analyzer::Json(_)));

        let xml = Analyzer::parse(BodyFormat::Xml, "<root/>").unwrap();
        assert!(matches!(xml, Analyzer::Xml(_)));

        let text = Analyzer::parse(BodyFormat::Text, "not { json").unwrap();
        assert!(matches!(text, Analyzer::Text(_)));
    }

    #[test]
    fn test_parse_failures_are_analysis_errors() {
        let error = Analyzer::parse(BodyFormat::Json, "not json").unwrap_err();
        assert!(matches!(error, Error::Analysis(_)));

        let error = Analyzer::parse(BodyFormat::Xml, "<root>").unwrap_err();
        assert!(matches!(error, Error::Analysis(_)));
    }

    #[test]
    fn test_capability_mismatch_is_an_extraction_error() {
        let analyzer = Analyzer::from(json!({}));
        assert!(analyzer.json().is_ok());
        let error = analyzer.xml().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Extraction error: cannot run an XPath query over a JSON body"
        );
    }
}
