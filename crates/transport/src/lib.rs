//! HTTP transport abstraction for the courier API client
//!
//! Defines the `HttpTransport` trait that decouples the session core from the
//! actual HTTP stack. The core builds fully-signed requests (method, URL,
//! ordered header list, query params, optional JSON body) and hands them to a
//! transport; `ReqwestTransport` is the production implementation. Tests
//! substitute a scripted transport and never touch the network.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn HttpTransport>`).

pub mod reqwest_impl;

pub use reqwest_impl::ReqwestTransport;

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// HTTP methods the courier API consumes. Anything else is rejected
/// before a request is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

/// A fully-prepared outgoing request.
///
/// Headers are an ordered list of `(name, value)` pairs rather than a
/// `HeaderMap` so the signed header set keeps its original casing until the
/// transport boundary.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and body of an upstream response. The transport never interprets
/// the status; that stays with the caller.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Errors from transport operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Http(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Abstraction over the HTTP stack used to reach the courier API.
pub trait HttpTransport: Send + Sync {
    /// Execute a prepared request and return the upstream status and body.
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Post".parse::<Method>().unwrap(), Method::Post);
    }

    #[test]
    fn method_rejects_unsupported_verbs() {
        for verb in ["DELETE", "PUT", "PATCH", "HEAD", ""] {
            let err = verb.parse::<Method>().unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedMethod(_)),
                "expected UnsupportedMethod for {verb:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn method_as_str_roundtrips() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
        assert_eq!(Method::Get.as_str().parse::<Method>().unwrap(), Method::Get);
    }

    #[test]
    fn request_builder_assembles_all_parts() {
        let request = HttpRequest::post("https://example.test/api")
            .with_headers(vec![("X-TIMESTAMP".into(), "1".into())])
            .with_query(vec![("page".into(), "2".into())])
            .with_json(serde_json::json!({"token": "rt"}));

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://example.test/api");
        assert_eq!(request.headers[0].0, "X-TIMESTAMP");
        assert_eq!(request.query[0], ("page".into(), "2".into()));
        assert_eq!(request.body.unwrap()["token"], "rt");
    }

    #[test]
    fn get_request_defaults_to_empty_parts() {
        let request = HttpRequest::get("https://example.test/");
        assert_eq!(request.method, Method::Get);
        assert!(request.headers.is_empty());
        assert!(request.query.is_empty());
        assert!(request.body.is_none());
    }
}
