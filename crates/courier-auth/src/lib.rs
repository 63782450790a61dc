//! Courier session and request-signing library
//!
//! Issues, persists, validates, and renews session credentials for one or
//! more identities against the courier delivery API, and reproduces the
//! Android client's deterministic HMAC request-signing scheme so the remote
//! service accepts each request. This crate is a standalone library with no
//! dependency on any binary; it is driven entirely through injected
//! collaborators (HTTP transport, one-time-code provider, credential file).
//!
//! Session flow:
//! 1. `SessionManager::authenticate()` sends the login challenge and asks
//!    the `CodeProvider` for the one-time code
//! 2. Successful validation stores the access/refresh pair via
//!    `CredentialStore::store_tokens()`
//! 3. Callers obtain a live token through `SessionManager::ensure_valid()`,
//!    which refreshes transparently when the access token lapses
//! 4. `SessionManager::logout()` clears the pair, best-effort notifying the
//!    remote service

pub mod code;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod signer;
pub mod wire;

pub use code::{CodeProvider, StdinCodeProvider};
pub use constants::*;
pub use credentials::{CredentialStore, IdentityRecord};
pub use error::{Error, Result};
pub use session::{AuthOptions, SessionInfo, SessionManager, SessionState, session_state};
pub use signer::{RequestSigner, generate_device_id, version_to_number};
