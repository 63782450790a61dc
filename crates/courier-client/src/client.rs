//! High-level business-call client
//!
//! `SessionClient` wraps a `SessionManager` and a transport: every call gets
//! a live access token (refreshing or authenticating first when needed), a
//! fully signed header set, and exactly one transparent refresh-and-retry
//! when the server rejects the token with a 401.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use courier_auth::code::CodeProvider;
use courier_auth::{CredentialStore, SessionManager};
use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

use crate::config::Config;
use crate::error::Result;

/// Authenticated client for business endpoints.
pub struct SessionClient {
    manager: Arc<SessionManager>,
    transport: Arc<dyn HttpTransport>,
}

impl SessionClient {
    pub fn new(manager: Arc<SessionManager>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { manager, transport }
    }

    /// Build a client from configuration: reqwest transport, file-backed
    /// credential store, and the given one-time-code provider.
    pub async fn from_config(
        config: &Config,
        code_provider: Arc<dyn CodeProvider>,
    ) -> Result<Self> {
        let store = Arc::new(CredentialStore::load(config.store.credentials_path.clone()).await?);
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
        let manager = Arc::new(SessionManager::new(
            store,
            transport.clone(),
            code_provider,
            config.api.base_url.clone(),
            config.api.app_version.clone(),
            config.api.signature_version.clone(),
        ));
        Ok(Self { manager, transport })
    }

    /// The session manager behind this client, for auth and lifecycle calls.
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Execute an authenticated call against a business endpoint.
    ///
    /// `method` is parsed before any network or token work, so an
    /// unsupported verb fails without side effects. Query parameters are
    /// merged into the URL before signing; the signature covers the path
    /// and the full query string.
    ///
    /// On a 401 the token pair is refreshed and the request retried exactly
    /// once with fresh headers. A second 401 is returned to the caller as a
    /// response, not an error.
    pub async fn call(
        &self,
        identity: &str,
        method: &str,
        url: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<HttpResponse> {
        let method: Method = method.parse()?;
        let url = merge_query(url, query)?;

        self.manager.ensure_valid(identity).await?;
        let request = self.build_request(identity, method, &url, body.clone()).await?;
        let response = self.transport.execute(&request).await?;

        if response.status != 401 {
            return Ok(response);
        }

        info!(identity, url = %url, "server rejected access token, refreshing and retrying once");
        self.manager.refresh(identity).await?;
        let request = self.build_request(identity, method, &url, body).await?;
        let response = self.transport.execute(&request).await?;
        if response.status == 401 {
            debug!(identity, "retry still unauthorized, giving up");
        }
        Ok(response)
    }

    async fn build_request(
        &self,
        identity: &str,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<HttpRequest> {
        let headers = self.manager.bearer_headers(identity, url).await?;
        let mut request = HttpRequest::new(method, url).with_headers(headers);
        if let Some(body) = body {
            request = request.with_json(body);
        }
        Ok(request)
    }
}

/// Append query parameters to the URL so the signed path covers them.
fn merge_query(url: &str, query: &[(String, String)]) -> Result<String> {
    if query.is_empty() {
        return Ok(url.to_string());
    }
    let mut parsed = url::Url::parse(url)
        .map_err(|e| courier_auth::Error::Configuration(format!("invalid url {url:?}: {e}")))?;
    {
        let mut pairs = parsed.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }
    Ok(parsed.into())
}
