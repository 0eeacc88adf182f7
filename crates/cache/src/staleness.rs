//! Shared TTL rule for every cache map.

use std::time::Duration;

use guildxp_core::types::Timestamp;

/// Entries older than this many TTLs are evicted by the sweep.
pub const EVICTION_FACTOR: u32 = 10;

/// `true` iff `now - loaded_at > ttl`. An entry exactly `ttl` old is fresh.
///
/// A TTL too large to represent never expires.
pub fn is_stale(loaded_at: Timestamp, ttl: Duration, now: Timestamp) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(loaded_at) > ttl,
        Err(_) => false,
    }
}

/// `true` iff the entry is past the sweep horizon of `EVICTION_FACTOR * ttl`.
pub fn is_evictable(loaded_at: Timestamp, ttl: Duration, now: Timestamp) -> bool {
    is_stale(loaded_at, ttl.saturating_mul(EVICTION_FACTOR), now)
}

/// `true` iff `at` happened less than `interval` before `now`.
pub fn within(at: Timestamp, interval: Duration, now: Timestamp) -> bool {
    match chrono::Duration::from_std(interval) {
        Ok(interval) => now.signed_duration_since(at) < interval,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn t(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn equal_age_is_fresh() {
        assert!(!is_stale(t(0), Duration::from_secs(60), t(60)));
    }

    #[test]
    fn one_past_ttl_is_stale() {
        assert!(is_stale(t(0), Duration::from_secs(60), t(61)));
        assert!(!is_stale(t(0), Duration::from_secs(60), t(59)));
    }

    #[test]
    fn eviction_uses_ten_ttls() {
        let ttl = Duration::from_secs(60);
        assert!(!is_evictable(t(0), ttl, t(600)));
        assert!(is_evictable(t(0), ttl, t(601)));
    }

    #[test]
    fn within_is_strict() {
        let interval = Duration::from_millis(5000);
        assert!(within(t(0), interval, t(4)));
        assert!(!within(t(0), interval, t(5)));
    }
}
