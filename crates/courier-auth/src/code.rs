//! One-time-code provider collaborator
//!
//! The challenge flow blocks on an external party supplying the numeric
//! code the server sent out-of-band. The trait keeps the session core
//! testable with a scripted stub; `StdinCodeProvider` is the interactive
//! implementation for operator-driven flows.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn CodeProvider>`).

use std::future::Future;
use std::pin::Pin;

use crate::error::{Error, Result};

/// Supplies a one-time code of the requested length when a challenge is
/// issued. The call blocks until the code is available; the core imposes
/// no timeout and never retries on its own.
pub trait CodeProvider: Send + Sync {
    fn provide_code(
        &self,
        length: usize,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

/// Reads the code from standard input, off the async runtime via
/// `spawn_blocking`.
pub struct StdinCodeProvider;

impl CodeProvider for StdinCodeProvider {
    fn provide_code(
        &self,
        length: usize,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            let code = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
                use std::io::Write;
                let mut stdout = std::io::stdout();
                write!(stdout, "Enter the {length}-digit code: ")?;
                stdout.flush()?;
                let mut line = String::new();
                std::io::stdin().read_line(&mut line)?;
                Ok(line.trim().to_string())
            })
            .await
            .map_err(|e| Error::Io(format!("code prompt task failed: {e}")))?
            .map_err(|e| Error::Io(format!("reading one-time code: {e}")))?;
            Ok(code)
        })
    }
}
