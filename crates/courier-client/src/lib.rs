//! High-level courier API client
//!
//! Ties the session crate and the transport together: configuration loading,
//! client construction, and authenticated business calls with transparent
//! token refresh. Library consumers start here; the lower crates are for
//! embedding custom transports or code providers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use courier_auth::{AuthOptions, StdinCodeProvider};
//! use courier_client::{Config, SessionClient};
//!
//! # async fn run() -> courier_client::Result<()> {
//! let config = Config::load(&Config::resolve_path(None))?;
//! let client = SessionClient::from_config(&config, Arc::new(StdinCodeProvider)).await?;
//! client.manager().authenticate("78005553535", AuthOptions::default()).await?;
//! let response = client
//!     .call("78005553535", "POST",
//!           "https://r-point.wb.ru/api/v1/delivery/tasks-get-by-assignee",
//!           &[], Some(serde_json::json!({})))
//!     .await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::SessionClient;
pub use config::{ApiConfig, Config, StoreConfig};
pub use error::{Error, Result};
