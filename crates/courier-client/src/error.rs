//! Error types for the high-level client

/// Errors surfaced by `SessionClient` calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] courier_auth::Error),

    #[error(transparent)]
    Transport(#[from] transport::Error),

    #[error(transparent)]
    Config(#[from] common::Error),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
