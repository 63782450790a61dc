//! Token lifecycle state machine
//!
//! `SessionManager` owns the auth/refresh/expiry flow for each identity:
//! challenge-based authentication (login → one-time code → validate),
//! transparent refresh once the access token lapses, and best-effort logout.
//! All state lives in the credential store; the manager re-reads it at every
//! operation and takes timestamps at call time.
//!
//! A per-manager Mutex serializes the mutating flows (authenticate, refresh,
//! logout) so two concurrent callers can't race a refresh-token rotation for
//! the same store. Cross-process arbitration is out of scope.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use common::unix_now;
use transport::HttpTransport;

use crate::code::CodeProvider;
use crate::constants::{
    ACCEPT, CONTENT_TYPE_JSON, DEFAULT_DEVICE_NAME, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
    DEVICE_TYPE, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, VALIDATE_PATH,
};
use crate::credentials::{CredentialStore, IdentityRecord};
use crate::error::{Error, Result};
use crate::signer::{RequestSigner, generate_device_id};
use crate::wire::{
    self, LoginRequest, LogoutRequest, RefreshRequest, TokenPair, ValidateRequest,
};

/// Where a record sits in the token lifecycle at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Access token live; carries the token itself
    Valid(String),
    /// Access token expired, refresh token still usable
    NeedsRefresh,
    /// Both expired (or the refresh pair is unusable); full re-auth required
    NeedsFullAuth,
    /// Never authenticated or logged out
    Unauthenticated,
}

/// Classify a record. Expiry is inclusive: `now >= expires_at` is expired.
///
/// An expired refresh token always classifies as `NeedsFullAuth` once the
/// access token is unusable, even if the server handed out a refresh TTL
/// shorter than the access TTL; that shape must not loop back into refresh.
pub fn session_state(record: &IdentityRecord, now: u64) -> SessionState {
    let (Some(access), Some(access_expires)) =
        (record.access_token.as_ref(), record.access_expires_at)
    else {
        return SessionState::Unauthenticated;
    };
    if now < access_expires {
        return SessionState::Valid(access.clone());
    }
    let refresh_usable = matches!(
        (record.refresh_token.as_ref(), record.refresh_expires_at),
        (Some(_), Some(expires)) if now < expires
    );
    if refresh_usable {
        SessionState::NeedsRefresh
    } else {
        SessionState::NeedsFullAuth
    }
}

/// Header set flavor: control-plane calls carry no Authorization header,
/// business calls add the Bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderMode {
    Auth,
    Bearer,
}

/// Optional overrides for a fresh authentication flow. Unset fields fall
/// back to a generated device id, the default device label, and the default
/// coordinates.
#[derive(Debug, Default, Clone)]
pub struct AuthOptions {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AuthOptions {
    /// Reuse an existing record's binding for a re-auth flow.
    fn from_record(record: &IdentityRecord) -> Self {
        Self {
            device_id: Some(record.device_id.clone()),
            device_name: Some(record.device_name.clone()),
            latitude: Some(record.latitude),
            longitude: Some(record.longitude),
        }
    }
}

/// Diagnostic projection of one identity's session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub identity: String,
    pub device_id: String,
    pub device_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Seconds until access expiry, clamped at 0; None when never issued
    pub access_expires_in: Option<u64>,
    pub refresh_expires_in: Option<u64>,
    pub is_authenticated: bool,
}

/// Owns the token lifecycle for every identity in one credential store.
pub struct SessionManager {
    store: Arc<CredentialStore>,
    transport: Arc<dyn HttpTransport>,
    code_provider: Arc<dyn CodeProvider>,
    base_url: String,
    app_version: String,
    signature_version: String,
    flow_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        store: Arc<CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        code_provider: Arc<dyn CodeProvider>,
        base_url: impl Into<String>,
        app_version: impl Into<String>,
        signature_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            code_provider,
            base_url: base_url.into(),
            app_version: app_version.into(),
            signature_version: signature_version.into(),
            flow_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The credential store backing this manager.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Run the challenge flow for an identity.
    ///
    /// Idempotent when already authenticated; downgrades to a refresh when
    /// only the access token lapsed. Otherwise: create or rebind the record,
    /// request the one-time code, collect it from the code provider, and
    /// validate. Tokens land in the store with expiries relative to the
    /// validate response's receipt time.
    pub async fn authenticate(&self, identity: &str, opts: AuthOptions) -> Result<()> {
        let _flow = self.flow_lock.lock().await;

        if let Some(record) = self.store.get(identity).await {
            match session_state(&record, unix_now()) {
                SessionState::Valid(_) => {
                    debug!(identity, "already authenticated, nothing to do");
                    return Ok(());
                }
                SessionState::NeedsRefresh => {
                    info!(identity, "access token expired, refreshing instead of full login");
                    return self.refresh_locked(identity).await;
                }
                SessionState::NeedsFullAuth | SessionState::Unauthenticated => {}
            }
        }

        let device_id = opts.device_id.unwrap_or_else(generate_device_id);
        let device_name = opts
            .device_name
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());
        let latitude = opts.latitude.unwrap_or(DEFAULT_LATITUDE);
        let longitude = opts.longitude.unwrap_or(DEFAULT_LONGITUDE);

        if self.store.get(identity).await.is_some() {
            self.store
                .reset_device(identity, device_id.clone(), device_name.clone(), latitude, longitude)
                .await?;
        } else {
            self.store
                .create(IdentityRecord::new(
                    identity,
                    device_id.clone(),
                    device_name.clone(),
                    latitude,
                    longitude,
                ))
                .await?;
        }
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;

        let login_url = self.endpoint(LOGIN_PATH);
        let headers = self.build_headers(&record, &login_url, HeaderMode::Auth)?;
        let login = wire::send_login(
            self.transport.as_ref(),
            &login_url,
            headers,
            &LoginRequest {
                device_type: DEVICE_TYPE,
                device_uuid: device_id.clone(),
                is_admin: false,
                phone: identity.to_string(),
            },
        )
        .await?;
        info!(identity, code_length = login.code_length, "one-time code issued");

        let code = self.code_provider.provide_code(login.code_length).await?;
        if code.len() != login.code_length {
            return Err(Error::Validation(format!(
                "code must be {} digits, got {}",
                login.code_length,
                code.len()
            )));
        }

        let validate_url = self.endpoint(VALIDATE_PATH);
        let headers = self.build_headers(&record, &validate_url, HeaderMode::Auth)?;
        let pair = wire::send_validate(
            self.transport.as_ref(),
            &validate_url,
            headers,
            &ValidateRequest {
                code,
                device_type: DEVICE_TYPE,
                device_uuid: device_id,
                token: login.data,
            },
        )
        .await?;

        self.store_token_pair(identity, pair).await?;
        info!(identity, "authentication complete");
        Ok(())
    }

    /// Return a live access token, refreshing or authenticating as needed.
    ///
    /// An identity with no record is an error; an identity whose refresh
    /// token has also expired surfaces `SessionExpired` without touching
    /// the network; the caller must run `authenticate` explicitly.
    pub async fn ensure_valid(&self, identity: &str) -> Result<String> {
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;

        match session_state(&record, unix_now()) {
            SessionState::Valid(token) => return Ok(token),
            SessionState::NeedsRefresh => {
                info!(identity, "access token expired, refreshing");
                self.refresh(identity).await?;
            }
            SessionState::Unauthenticated => {
                info!(identity, "no tokens on record, starting authentication");
                self.authenticate(identity, AuthOptions::from_record(&record))
                    .await?;
            }
            SessionState::NeedsFullAuth => {
                return Err(Error::SessionExpired(identity.to_string()));
            }
        }

        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;
        match session_state(&record, unix_now()) {
            SessionState::Valid(token) => Ok(token),
            _ => Err(Error::SessionExpired(identity.to_string())),
        }
    }

    /// Rotate the token pair using the refresh token.
    pub async fn refresh(&self, identity: &str) -> Result<()> {
        let _flow = self.flow_lock.lock().await;
        self.refresh_locked(identity).await
    }

    async fn refresh_locked(&self, identity: &str) -> Result<()> {
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;

        let now = unix_now();
        let refresh_token = match (record.refresh_token.clone(), record.refresh_expires_at) {
            (Some(token), Some(expires)) if now < expires => token,
            _ => return Err(Error::SessionExpired(identity.to_string())),
        };

        let url = self.endpoint(REFRESH_PATH);
        let headers = self.build_headers(&record, &url, HeaderMode::Auth)?;
        let pair = wire::send_refresh(
            self.transport.as_ref(),
            &url,
            headers,
            &RefreshRequest { token: refresh_token },
        )
        .await?;

        self.store_token_pair(identity, pair).await?;
        info!(identity, "tokens refreshed");
        Ok(())
    }

    /// End the session: best-effort remote logout, unconditional local clear.
    ///
    /// A no-op for unauthenticated identities. Network failures during the
    /// remote call are logged and swallowed; local token state is cleared
    /// either way.
    pub async fn logout(&self, identity: &str) -> Result<()> {
        let _flow = self.flow_lock.lock().await;

        let Some(record) = self.store.get(identity).await else {
            debug!(identity, "no record, nothing to log out");
            return Ok(());
        };
        if record.access_token.is_none() {
            debug!(identity, "not authenticated, nothing to log out");
            return Ok(());
        }

        if record.is_authenticated(unix_now()) {
            let url = self.endpoint(LOGOUT_PATH);
            match self
                .build_headers(&record, &url, HeaderMode::Bearer)
                .and_then(|headers| {
                    wire::post_json(&url, headers, &LogoutRequest { device_type: DEVICE_TYPE })
                }) {
                Ok(request) => match self.transport.execute(&request).await {
                    Ok(response) if response.status == 200 => {
                        info!(identity, "logout acknowledged by server");
                    }
                    Ok(response) => {
                        warn!(
                            identity,
                            status = response.status,
                            "logout endpoint returned an error, clearing local session anyway"
                        );
                    }
                    Err(e) => {
                        warn!(identity, error = %e, "logout request failed, clearing local session anyway");
                    }
                },
                Err(e) => {
                    warn!(identity, error = %e, "could not build logout request, clearing local session anyway");
                }
            }
        } else {
            debug!(identity, "access token already expired, clearing local session only");
        }

        self.store.clear_tokens(identity).await
    }

    /// Diagnostic projection for one identity.
    pub async fn get_info(&self, identity: &str) -> Result<SessionInfo> {
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;

        let now = unix_now();
        Ok(SessionInfo {
            identity: record.identity.clone(),
            device_id: record.device_id.clone(),
            device_name: record.device_name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            is_authenticated: record.is_authenticated(now),
            access_expires_in: record.access_expires_at.map(|e| e.saturating_sub(now)),
            refresh_expires_in: record.refresh_expires_at.map(|e| e.saturating_sub(now)),
            access_token: record.access_token,
            refresh_token: record.refresh_token,
        })
    }

    /// Update the last-known coordinates, independent of auth state.
    pub async fn update_coordinates(
        &self,
        identity: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        self.store
            .update_coordinates(identity, latitude, longitude)
            .await?;
        info!(identity, latitude, longitude, "coordinates updated");
        Ok(())
    }

    /// Signed bearer-mode headers for a business call against `url`.
    pub async fn bearer_headers(&self, identity: &str, url: &str) -> Result<Vec<(String, String)>> {
        let record = self
            .store
            .get(identity)
            .await
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;
        self.build_headers(&record, url, HeaderMode::Bearer)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Signed header set bound to `url`'s host and path+query, in the
    /// requested mode. Bearer mode requires a stored access token.
    fn build_headers(
        &self,
        record: &IdentityRecord,
        url: &str,
        mode: HeaderMode,
    ) -> Result<Vec<(String, String)>> {
        let signer = RequestSigner::new(
            self.app_version.clone(),
            self.signature_version.clone(),
            record.device_id.clone(),
            record.device_name.clone(),
        )?;
        let (host, path) = split_url(url)?;
        let mut headers = signer.headers(&host, &path, record.latitude, record.longitude, None)?;
        headers.push(("Accept".to_string(), ACCEPT.to_string()));
        headers.push(("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()));
        if mode == HeaderMode::Bearer {
            let token = record
                .access_token
                .as_ref()
                .ok_or_else(|| Error::SessionExpired(record.identity.clone()))?;
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        Ok(headers)
    }

    /// Convert server TTLs to absolute expiries at receipt time and persist.
    async fn store_token_pair(&self, identity: &str, pair: TokenPair) -> Result<()> {
        let now = unix_now();
        if pair.refresh.ttl < pair.access.ttl {
            warn!(
                identity,
                access_ttl = pair.access.ttl,
                refresh_ttl = pair.refresh.ttl,
                "server returned a refresh TTL shorter than the access TTL"
            );
        }
        self.store
            .store_tokens(
                identity,
                pair.access.token,
                pair.refresh.token,
                now.saturating_add(pair.access.ttl),
                now.saturating_add(pair.refresh.ttl),
            )
            .await
    }
}

/// Split a URL into the Host header value (host, plus port when explicit)
/// and the signed path including the query string.
fn split_url(url: &str) -> Result<(String, String)> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::Configuration(format!("invalid url {url:?}: {e}")))?;
    let host = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(Error::Configuration(format!("url {url:?} has no host")));
        }
    };
    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Ok((host, path))
}
