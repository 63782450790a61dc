//! Credential storage for identity records
//!
//! Manages a JSON file mapping identities (phone-like keys) to their device
//! binding, coordinates, and token state. All writes use atomic temp-file +
//! rename to prevent corruption on crash. A tokio Mutex serializes concurrent
//! writes so a read-then-write sequence on one record never interleaves with
//! another mutation.
//!
//! The credential file is the single source of truth for session state; the
//! session manager re-reads it on every operation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use common::unix_now;

use crate::error::{Error, Result};

/// One identity's persistent record.
///
/// The token invariant: `access_token` and `access_expires_at` are set and
/// cleared together, likewise the refresh pair. A record with no access
/// token is unauthenticated regardless of the other fields. Expiries are
/// absolute unix seconds computed at storage time from the server TTLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Unique key (e.g. a phone number)
    pub identity: String,
    /// Opaque device identifier, generated once per identity at first auth
    pub device_id: String,
    /// Human-readable device label
    pub device_name: String,
    /// Last-known position, also sent as the signed `X-COORDINATES` header
    pub latitude: f64,
    pub longitude: f64,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute expiry in unix seconds; set iff `access_token` is set
    pub access_expires_at: Option<u64>,
    /// Absolute expiry in unix seconds; set iff `refresh_token` is set
    pub refresh_expires_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl IdentityRecord {
    /// Fresh unauthenticated record.
    pub fn new(
        identity: impl Into<String>,
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let now = unix_now();
        Self {
            identity: identity.into(),
            device_id: device_id.into(),
            device_name: device_name.into(),
            latitude,
            longitude,
            access_token: None,
            refresh_token: None,
            access_expires_at: None,
            refresh_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record holds an access token that is still live at `now`.
    /// Expiry is inclusive: a token expiring exactly at `now` is dead.
    pub fn is_authenticated(&self, now: u64) -> bool {
        match (&self.access_token, self.access_expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }
}

/// Thread-safe credential file manager.
///
/// The Mutex serializes all access; mutating methods update the in-memory
/// map and persist before releasing the lock.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, IdentityRecord>>,
}

impl CredentialStore {
    /// Load identity records from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` so future loads skip
    /// the cold-start path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let records: HashMap<String, IdentityRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), identities = records.len(), "loaded credentials");
            records
        } else {
            info!(path = %path.display(), "credential file not found, starting with empty store");
            let records = HashMap::new();
            write_atomic(&path, &records).await?;
            records
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Get a clone of one identity's record.
    pub async fn get(&self, identity: &str) -> Option<IdentityRecord> {
        let state = self.state.lock().await;
        state.get(identity).cloned()
    }

    /// Insert a new record and persist. Fails if the identity already exists;
    /// callers check existence first and reset instead of re-creating.
    pub async fn create(&self, record: IdentityRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.contains_key(&record.identity) {
            return Err(Error::IdentityExists(record.identity));
        }
        debug!(identity = %record.identity, "created identity record");
        state.insert(record.identity.clone(), record);
        write_atomic(&self.path, &state).await
    }

    /// Store a fresh access/refresh pair with absolute expiries.
    pub async fn store_tokens(
        &self,
        identity: &str,
        access_token: String,
        refresh_token: String,
        access_expires_at: u64,
        refresh_expires_at: u64,
    ) -> Result<()> {
        self.mutate(identity, |record| {
            record.access_token = Some(access_token);
            record.refresh_token = Some(refresh_token);
            record.access_expires_at = Some(access_expires_at);
            record.refresh_expires_at = Some(refresh_expires_at);
        })
        .await?;
        debug!(identity, "stored token pair");
        Ok(())
    }

    /// Clear both token pairs (logout or forced re-auth).
    pub async fn clear_tokens(&self, identity: &str) -> Result<()> {
        self.mutate(identity, |record| {
            record.access_token = None;
            record.refresh_token = None;
            record.access_expires_at = None;
            record.refresh_expires_at = None;
        })
        .await?;
        debug!(identity, "cleared tokens");
        Ok(())
    }

    /// Rebind the record to a device before a fresh challenge flow.
    /// Clears any stale tokens, since they belong to the previous binding.
    pub async fn reset_device(
        &self,
        identity: &str,
        device_id: String,
        device_name: String,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        self.mutate(identity, |record| {
            record.device_id = device_id;
            record.device_name = device_name;
            record.latitude = latitude;
            record.longitude = longitude;
            record.access_token = None;
            record.refresh_token = None;
            record.access_expires_at = None;
            record.refresh_expires_at = None;
        })
        .await?;
        debug!(identity, "reset device binding");
        Ok(())
    }

    /// Update the last-known coordinates, independent of auth state.
    pub async fn update_coordinates(
        &self,
        identity: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        self.mutate(identity, |record| {
            record.latitude = latitude;
            record.longitude = longitude;
        })
        .await
    }

    /// List all identity keys.
    pub async fn identities(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.keys().cloned().collect()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply a partial update to one record under the lock, refresh
    /// `updated_at`, and persist.
    async fn mutate<F>(&self, identity: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut IdentityRecord),
    {
        let mut state = self.state.lock().await;
        let record = state
            .get_mut(identity)
            .ok_or_else(|| Error::IdentityNotFound(identity.to_string()))?;
        apply(record);
        record.updated_at = unix_now();
        write_atomic(&self.path, &state).await
    }
}

/// Write records to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains session tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, IdentityRecord>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
