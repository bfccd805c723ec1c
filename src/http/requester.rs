//! The transport seam and its reqwest-backed implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use time::OffsetDateTime;
use tracing::debug;

use super::request::{Method, PreparedRequest};
use super::response::{ExecutionReport, Response};
use crate::common::{Error, Result};

/// Issues HTTP attempts. Runners are generic over this seam so they can be
/// exercised without a live server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute exactly one attempt. Transport failures are captured in the
    /// report, never surfaced as `Err`.
    async fn execute(&self, request: &PreparedRequest) -> (ExecutionReport, Option<Response>);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: &PreparedRequest) -> (ExecutionReport, Option<Response>) {
        (**self).execute(request).await
    }
}

/// A transport bound to a base URL, with an optional per-attempt timeout
#[derive(Debug, Clone)]
pub struct Requester {
    client: Client,
    base_url: String,
}

impl Requester {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {}: {}", base_url, e)))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build the HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    fn url_of(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for Requester {
    async fn execute(&self, request: &PreparedRequest) -> (ExecutionReport, Option<Response>) {
        let summary = request.to_string();
        let url = self.url_of(&request.path);
        debug!("Executing {}", summary);

        let mut builder = self.client.request(method_of(request.method), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let starts = OffsetDateTime::now_utc();
        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        )
                    })
                    .collect();
                match response.text().await {
                    Ok(body) => (
                        ExecutionReport::success(summary, starts, OffsetDateTime::now_utc()),
                        Some(Response {
                            status,
                            headers,
                            body,
                        }),
                    ),
                    Err(e) => (
                        ExecutionReport::failure(
                            summary,
                            starts,
                            OffsetDateTime::now_utc(),
                            format!("cannot read the response body: {}", e),
                        ),
                        None,
                    ),
                }
            }
            Err(e) => (
                ExecutionReport::failure(summary, starts, OffsetDateTime::now_utc(), e.to_string()),
                None,
            ),
        }
    }
}

fn method_of(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BoundValue, Context};
    use crate::http::request::{ParamValue, Request};
    use serde_json::json;

    fn prepared(request: Request) -> PreparedRequest {
        request.prepare(&Context::now())
    }

    #[tokio::test]
    async fn test_get_with_query_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users")
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "10".into()))
            .match_header("x-token", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"users": []}"#)
            .create_async()
            .await;

        let requester = Requester::new(server.url(), None).unwrap();
        let request = prepared(Request {
            path: "/users".into(),
            headers: vec![("x-token".into(), "secret".into())],
            params: vec![(
                "limit".into(),
                ParamValue::Scalar(BoundValue::Literal(json!(10))),
            )],
            ..Request::default()
        });

        let (report, response) = requester.execute(&request).await;
        mock.assert_async().await;
        assert!(report.is_succeeded());
        let response = response.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"users": []}"#);
        assert!(response
            .headers
            .iter()
            .any(|(name, value)| name == "content-type" && value == "application/json"));
    }

    #[tokio::test]
    async fn test_post_with_a_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/users")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({"name": "gaetan"})))
            .with_status(201)
            .create_async()
            .await;

        let requester = Requester::new(server.url(), None).unwrap();
        let request = prepared(Request {
            method: Method::Post,
            path: "/users".into(),
            body: Some(json!({"name": "gaetan"})),
            ..Request::default()
        });

        let (report, response) = requester.execute(&request).await;
        mock.assert_async().await;
        assert!(report.is_succeeded());
        assert_eq!(response.unwrap().status, 201);
    }

    #[tokio::test]
    async fn test_error_statuses_are_still_responses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let requester = Requester::new(server.url(), None).unwrap();
        let request = prepared(Request {
            path: "/missing".into(),
            ..Request::default()
        });

        let (report, response) = requester.execute(&request).await;
        assert!(report.is_succeeded());
        assert_eq!(response.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_connection_failures_land_in_the_report() {
        let requester = Requester::new("http://127.0.0.1:1", None).unwrap();
        let request = prepared(Request::default());

        let (report, response) = requester.execute(&request).await;
        assert_eq!(report.status, crate::verify::Status::Failure);
        assert!(report.message.is_some());
        assert!(response.is_none());
    }

    #[test]
    fn test_malformed_base_urls_are_rejected() {
        let error = Requester::new("not a url", None).err().unwrap();
        assert!(error.to_string().contains("invalid base URL"));
    }
}
