//! Wall-clock helpers
//!
//! Every expiry comparison and signature timestamp in the workspace goes
//! through `unix_now` so the "compute time at call time, never at
//! construction" rule holds in one place.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
