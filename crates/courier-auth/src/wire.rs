//! Control-plane wire types and calls
//!
//! Request/response shapes for the login, validate, refresh, and logout
//! endpoints, plus the helpers that execute them through an `HttpTransport`.
//! Any non-200 status is surfaced as `Error::Authentication` carrying the
//! operation name, status, and body; the session layer never retries these.

use serde::{Deserialize, Serialize};

use transport::{HttpRequest, HttpResponse, HttpTransport, Method};

use crate::error::{Error, Result};

/// `POST /wbc/api/v1/login`, issues the one-time-code challenge.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub device_type: &'static str,
    pub device_uuid: String,
    pub is_admin: bool,
    pub phone: String,
}

/// Login response: an opaque validation token and the required code length.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    /// Opaque validation token, echoed back in the validate request
    pub data: String,
    pub code_length: usize,
}

/// `POST /wbc/api/v1/courier/validate`, completes the challenge.
#[derive(Debug, Serialize)]
pub struct ValidateRequest {
    pub code: String,
    pub device_type: &'static str,
    pub device_uuid: String,
    pub token: String,
}

/// One token with its TTL in seconds (delta from the response receipt time,
/// not absolute). The caller converts to an absolute expiry when storing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub ttl: u64,
}

/// Validate and refresh both return a fresh access/refresh pair.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: TokenGrant,
    pub refresh: TokenGrant,
}

/// `POST /wbc/api/v1/courier/refresh` body.
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// `POST /wbc/api/v1/logout` body. The server's camelCase outlier.
#[derive(Debug, Serialize)]
pub struct LogoutRequest {
    #[serde(rename = "deviceType")]
    pub device_type: &'static str,
}

/// Build a POST with a JSON body and the given pre-signed headers.
pub fn post_json(
    url: &str,
    headers: Vec<(String, String)>,
    body: &impl Serialize,
) -> Result<HttpRequest> {
    let body = serde_json::to_value(body)
        .map_err(|e| Error::Io(format!("encoding request body: {e}")))?;
    Ok(HttpRequest::new(Method::Post, url)
        .with_headers(headers)
        .with_json(body))
}

pub async fn send_login(
    transport: &dyn HttpTransport,
    url: &str,
    headers: Vec<(String, String)>,
    request: &LoginRequest,
) -> Result<LoginResponse> {
    let response = transport.execute(&post_json(url, headers, request)?).await?;
    parse_ok("login", response)
}

pub async fn send_validate(
    transport: &dyn HttpTransport,
    url: &str,
    headers: Vec<(String, String)>,
    request: &ValidateRequest,
) -> Result<TokenPair> {
    let response = transport.execute(&post_json(url, headers, request)?).await?;
    parse_ok("validate", response)
}

pub async fn send_refresh(
    transport: &dyn HttpTransport,
    url: &str,
    headers: Vec<(String, String)>,
    request: &RefreshRequest,
) -> Result<TokenPair> {
    let response = transport.execute(&post_json(url, headers, request)?).await?;
    parse_ok("refresh", response)
}

/// Require an exact 200 and deserialize the body.
fn parse_ok<T: for<'de> Deserialize<'de>>(
    operation: &'static str,
    response: HttpResponse,
) -> Result<T> {
    if response.status != 200 {
        return Err(Error::Authentication {
            operation,
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| Error::InvalidResponse {
        operation,
        detail: e.to_string(),
    })
}
