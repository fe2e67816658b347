//! TTL staleness check

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Returns true when `now` is past `last_validated + ttl`
///
/// A record that was never validated counts as validated at the Unix epoch,
/// so it is always stale. A TTL too large to represent never expires.
pub fn is_stale(last_validated: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let last = last_validated.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        return false;
    };
    match last.checked_add_signed(ttl) {
        Some(expires_at) => now > expires_at,
        None => false,
    }
}

/// [`is_stale`] against the current time
pub fn is_stale_now(last_validated: Option<DateTime<Utc>>, ttl: Duration) -> bool {
    is_stale(last_validated, ttl, Utc::now())
}
