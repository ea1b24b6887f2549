//! Expiry applied to a session when it is saved.

use std::time::Duration;

use crate::config::StoreOptions;
use crate::session::SessionRecord;

/// TTL used when neither the store nor the session specifies one (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_millis(86_400_000);

/// Work out the TTL to send with a save.
///
/// Precedence, highest first:
/// 1. `disable_ttl` set: no TTL at all.
/// 2. Store-wide `ttl_ms`, even when zero and even when the cookie disagrees.
/// 3. The cookie's `maxAge`, floored to whole milliseconds. A negative
///    `maxAge` counts as no hint.
/// 4. [`DEFAULT_TTL`].
pub fn effective_ttl(options: &StoreOptions, record: &SessionRecord) -> Option<Duration> {
    if options.disable_ttl {
        return None;
    }
    if let Some(ttl) = options.ttl() {
        return Some(ttl);
    }
    let hint = record.max_age_hint().filter(|m| *m >= 0.0);
    Some(hint.map_or(DEFAULT_TTL, hint_ttl))
}

fn hint_ttl(max_age: f64) -> Duration {
    // Float to int casts saturate, so huge hints clamp to u64::MAX
    Duration::from_millis(max_age.floor() as u64)
}
