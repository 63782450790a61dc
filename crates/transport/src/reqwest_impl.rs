//! Production transport over `reqwest`
//!
//! One shared `reqwest::Client` (connection pooling) executes every request.
//! The response body is always drained to a string so the caller can surface
//! upstream error bodies verbatim.

use tracing::debug;

use crate::{Error, HttpRequest, HttpResponse, HttpTransport, Method, Result};

/// `HttpTransport` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Wrap an existing client (custom timeouts, proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<HttpResponse>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut builder = match request.method {
                Method::Get => self.client.get(&request.url),
                Method::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| Error::Http(format!("{} {} failed: {e}", request.method.as_str(), request.url)))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| Error::Http(format!("reading response body from {}: {e}", request.url)))?;

            debug!(
                method = request.method.as_str(),
                url = %request.url,
                status,
                "request executed"
            );
            Ok(HttpResponse { status, body })
        })
    }
}
