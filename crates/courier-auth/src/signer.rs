//! Deterministic request signing
//!
//! Reproduces the Android client's security interceptor: every outgoing
//! request carries an HMAC-SHA256 signature over
//! `{timestamp}{app_version}{path}` plus a fixed set of device and version
//! headers. The server rejects requests whose signature doesn't match, so
//! the payload construction here must stay byte-exact.
//!
//! The signer is a pure function of its inputs: no state, no I/O. The
//! timestamp is taken at call time, never captured at construction.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use common::{Secret, unix_now};

use crate::constants::{HMAC_SECRET, USER_AGENT};
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Generate a fresh device identifier (random UUID v4, the format the
/// Android OS hands out on activation). One per identity, stable across
/// re-auth unless explicitly rotated.
pub fn generate_device_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Map a dotted version string to the Android version-code integer.
///
/// Up to four numeric parts; missing parts default to 0:
/// `major*1_000_000 + minor*10_000 + patch*100 + build`.
/// `"4.91.2"` → `4_910_200`.
pub fn version_to_number(version: &str) -> Result<u64> {
    let mut parts = [0u64; 4];
    for (i, raw) in version.split('.').take(4).enumerate() {
        parts[i] = raw.parse().map_err(|_| {
            Error::Configuration(format!(
                "non-numeric component {raw:?} in app version {version:?}"
            ))
        })?;
    }
    parts[0]
        .checked_mul(1_000_000)
        .and_then(|n| n.checked_add(parts[1].checked_mul(10_000)?))
        .and_then(|n| n.checked_add(parts[2].checked_mul(100)?))
        .and_then(|n| n.checked_add(parts[3]))
        .ok_or_else(|| {
            Error::Configuration(format!("app version {version:?} overflows the version code"))
        })
}

/// Per-identity request signer.
///
/// Holds the app version, the opaque signature-scheme tag, and the identity's
/// device binding. The HMAC secret is the compiled-in build constant unless a
/// different one is supplied via `with_secret`.
pub struct RequestSigner {
    app_version: String,
    signature_version: String,
    device_id: String,
    device_name: String,
    hmac_secret: Secret<String>,
}

impl RequestSigner {
    pub fn new(
        app_version: impl Into<String>,
        signature_version: impl Into<String>,
        device_id: impl Into<String>,
        device_name: impl Into<String>,
    ) -> Result<Self> {
        Self::with_secret(
            app_version,
            signature_version,
            device_id,
            device_name,
            HMAC_SECRET,
        )
    }

    /// Construct with an explicit HMAC secret. Fails fast on a malformed
    /// version string or an empty secret rather than at signing time.
    pub fn with_secret(
        app_version: impl Into<String>,
        signature_version: impl Into<String>,
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        hmac_secret: &str,
    ) -> Result<Self> {
        let app_version = app_version.into();
        version_to_number(&app_version)?;
        if hmac_secret.is_empty() {
            return Err(Error::Configuration("signing secret is empty".into()));
        }
        Ok(Self {
            app_version,
            signature_version: signature_version.into(),
            device_id: device_id.into(),
            device_name: device_name.into(),
            hmac_secret: Secret::new(hmac_secret.to_string()),
        })
    }

    /// HMAC-SHA256 over `{timestamp}{app_version}{path}` as lowercase hex.
    fn signature(&self, timestamp: u64, path: &str) -> Result<String> {
        let payload = format!("{timestamp}{}{path}", self.app_version);
        let mut mac = HmacSha256::new_from_slice(self.hmac_secret.expose().as_bytes())
            .map_err(|e| Error::Configuration(format!("invalid signing secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build the full signed header set for one request.
    ///
    /// `path` must include the query string when present, since the query is
    /// part of the signed payload. `timestamp` defaults to the current unix
    /// second when not supplied.
    pub fn headers(
        &self,
        host: &str,
        path: &str,
        latitude: f64,
        longitude: f64,
        timestamp: Option<u64>,
    ) -> Result<Vec<(String, String)>> {
        let timestamp = timestamp.unwrap_or_else(unix_now);
        let signature = self.signature(timestamp, path)?;
        let version_code = version_to_number(&self.app_version)?;

        let own = |s: &str| s.to_string();
        Ok(vec![
            (own("X-COORDINATES"), format!("{latitude}:{longitude}")),
            (own("X-APP-VERSION"), self.app_version.clone()),
            (own("X-APP-TYPE"), own("android")),
            (own("DEVICE-ID"), self.device_id.clone()),
            (own("DEVICE-NAME"), self.device_name.clone()),
            (own("DEBUG"), own("false")),
            (own("X-WB-COURIER-VERSION-NAME"), self.app_version.clone()),
            (own("X-WB-COURIER-VERSION-CODE"), version_code.to_string()),
            (own("X-WB-COURIER-VERSION-ANDROID-ID"), self.device_id.clone()),
            (own("X-WB-COURIER-VERSION-IS-DEBUG"), own("false")),
            (own("X-TIMESTAMP"), timestamp.to_string()),
            (own("X-SIGNATURE-VERSION"), self.signature_version.clone()),
            (own("X-SIGNATURE"), signature),
            (own("Host"), own(host)),
            (own("Connection"), own("Keep-Alive")),
            (own("Accept-Encoding"), own("gzip")),
            (own("User-Agent"), own(USER_AGENT)),
        ])
    }
}
