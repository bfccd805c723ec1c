//! Received responses and per-attempt reports

use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::context::format_rfc3339;
use crate::verify::Status;

/// A response as the transport saw it
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Outcome of a single HTTP attempt. Transport failures land in the
/// message, they are not errors.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub request: String,
    pub status: Status,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub starts: OffsetDateTime,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub ends: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecutionReport {
    pub fn success(request: String, starts: OffsetDateTime, ends: OffsetDateTime) -> Self {
        Self {
            request,
            status: Status::Success,
            starts,
            ends,
            message: None,
        }
    }

    pub fn failure(
        request: String,
        starts: OffsetDateTime,
        ends: OffsetDateTime,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request,
            status: Status::Failure,
            starts,
            ends,
            message: Some(message.into()),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status.is_succeeded()
    }
}

fn serialize_rfc3339<S: Serializer>(
    instant: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_rfc3339(*instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::format_description::well_known::Rfc3339;

    #[test]
    fn test_report_serialization() {
        let starts = OffsetDateTime::parse("2021-01-23T12:00:00Z", &Rfc3339).unwrap();
        let ends = OffsetDateTime::parse("2021-01-23T12:00:01Z", &Rfc3339).unwrap();
        let report =
            ExecutionReport::failure("GET /health".into(), starts, ends, "connection refused");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "request": "GET /health",
                "status": "FAILURE",
                "starts": "2021-01-23T12:00:00Z",
                "ends": "2021-01-23T12:00:01Z",
                "message": "connection refused",
            })
        );
    }

    #[test]
    fn test_success_report_omits_the_message() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let report = ExecutionReport::success("GET /".into(), now, now);
        assert!(report.is_succeeded());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("message").is_none());
    }
}
