use crate::types::UnixTimestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole seconds. Clocks set before the epoch read as 0.
pub fn unix_now() -> UnixTimestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
