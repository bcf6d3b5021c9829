//! # Time Utilities
//!
//! Wall-clock helpers using chrono.

use chrono::{DateTime, Utc};

fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as seconds since the Unix epoch (0 if the clock reads before the epoch).
pub fn unix_timestamp() -> u64 {
    u64::try_from(now_utc().timestamp()).unwrap_or(0)
}
