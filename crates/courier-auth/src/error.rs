//! Error types for session and signing operations

/// Errors from session, signing, and credential-store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    #[error("identity already exists: {0}")]
    IdentityExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{operation} failed with status {status}: {body}")]
    Authentication {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid {operation} response: {detail}")]
    InvalidResponse {
        operation: &'static str,
        detail: String,
    },

    #[error("session expired for {0}: full re-authentication required")]
    SessionExpired(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("transport error: {0}")]
    Transport(#[from] transport::Error),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_carries_status_and_body() {
        let err = Error::Authentication {
            operation: "login",
            status: 502,
            body: "upstream unavailable".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("login"), "got: {msg}");
        assert!(msg.contains("502"), "got: {msg}");
        assert!(msg.contains("upstream unavailable"), "got: {msg}");
    }

    #[test]
    fn session_expired_names_the_identity() {
        let err = Error::SessionExpired("78005553535".into());
        assert!(err.to_string().contains("78005553535"));
        assert!(err.to_string().contains("re-authentication"));
    }

    #[test]
    fn transport_error_converts() {
        let err: Error = transport::Error::UnsupportedMethod("PUT".into()).into();
        assert!(matches!(err, Error::Transport(_)));
    }
}
