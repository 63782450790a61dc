//! Common types for the courier session toolkit

mod error;
mod secret;
mod time;

pub use error::{Error, Result};
pub use secret::Secret;
pub use time::unix_now;
