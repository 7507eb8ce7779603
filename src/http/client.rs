//! HTTP transport for upstream providers
//!
//! Thin reqwest wrapper: one request per call, an explicit timeout, and a
//! response decoded into either JSON or raw text.

use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::ParamValue;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream call errors
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream returned malformed JSON (HTTP {status}): {reason}")]
    MalformedJson {
        status: u16,
        body: String,
        reason: String,
    },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("connection to {0} failed")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("service {0} has no base URL configured")]
    NotConfigured(String),

    #[error("{0} is not a single-point operation")]
    NotPointQuery(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl UpstreamError {
    /// HTTP status returned by the upstream, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } | UpstreamError::MalformedJson { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Raw response body, if one was received
    pub fn body(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { body, .. } | UpstreamError::MalformedJson { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    /// Short classification used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Status { .. } => "status",
            UpstreamError::MalformedJson { .. } => "malformed_json",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Request(_) => "request",
            UpstreamError::NotConfigured(_) => "not_configured",
            UpstreamError::NotPointQuery(_) => "not_point_query",
            UpstreamError::Client(_) => "client",
        }
    }
}

/// Request method
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMethod::Get => f.write_str("GET"),
            RequestMethod::Post => f.write_str("POST"),
        }
    }
}

/// A single upstream request.
///
/// GET sends the parameters as a query string, POST as a JSON object body
/// with numbers and booleans kept as such.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamRequest {
    pub method: RequestMethod,
    pub url: String,
    pub parameters: Vec<(String, ParamValue)>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Get,
            url: url.into(),
            parameters: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Post,
            ..Self::get(url)
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        self.parameters
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn query_pairs(&self) -> Vec<(&str, String)> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect()
    }

    fn json_body(&self) -> serde_json::Map<String, Value> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

/// Decoded response body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    fn decode(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    /// Body rendered back to text
    pub fn to_text(&self) -> String {
        match self {
            ResponseBody::Json(v) => v.to_string(),
            ResponseBody::Text(t) => t.clone(),
        }
    }

    /// Whether the body carries any content at all
    pub fn is_empty(&self) -> bool {
        match self {
            ResponseBody::Json(Value::Null) => true,
            ResponseBody::Json(Value::Array(a)) => a.is_empty(),
            ResponseBody::Json(Value::Object(o)) => o.is_empty(),
            ResponseBody::Json(Value::String(s)) => s.trim().is_empty(),
            ResponseBody::Json(_) => false,
            ResponseBody::Text(t) => t.trim().is_empty(),
        }
    }
}

/// Upstream response, consumed right after the call
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Require a 2xx status and a JSON body
    pub fn into_json(self) -> Result<Value, UpstreamError> {
        if !self.is_success() {
            return Err(UpstreamError::Status {
                status: self.status_code,
                body: self.body.to_text(),
            });
        }

        match self.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Text(text) => {
                let reason = serde_json::from_str::<Value>(&text)
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "not a JSON document".to_string());
                Err(UpstreamError::MalformedJson {
                    status: self.status_code,
                    body: text,
                    reason,
                })
            }
        }
    }
}

/// HTTP client with an explicit per-request timeout
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with the default timeout
    #[cfg(test)]
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create client with custom timeout
    #[cfg(test)]
    pub fn with_timeout(timeout: Duration) -> Result<Self, UpstreamError> {
        Self::build(timeout, false)
    }

    /// Create client that also skips TLS certificate verification
    pub fn build(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request
    pub async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        debug!(
            "Sending {} request to {} ({} params)",
            request.method,
            request.url,
            request.parameters.len()
        );

        let builder = match request.method {
            RequestMethod::Get => self
                .client
                .request(Method::GET, &request.url)
                .query(&request.query_pairs()),
            RequestMethod::Post => self
                .client
                .request(Method::POST, &request.url)
                .json(&request.json_body()),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify(&request.url, e))?;

        let status_code = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify(&request.url, e))?;

        debug!("{} answered HTTP {} ({} bytes)", request.url, status_code, text.len());

        Ok(UpstreamResponse {
            status_code,
            body: ResponseBody::decode(text),
        })
    }

    /// Send a request and require a JSON success response
    pub async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, UpstreamError> {
        self.send(request).await?.into_json()
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            UpstreamError::Connect(url.to_string())
        } else {
            UpstreamError::Request(e.to_string())
        }
    }
}
