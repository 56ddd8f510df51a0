//! The XFetch expiration decision.
//!
//! These functions are pure: the caller supplies the clock reading and the
//! random sample, which makes the decision reproducible in tests.

use std::time::{Duration, Instant};

/// Compute how far ahead of `now` an expiry check should look.
///
/// The window is `delta * beta * -ln(u)`. For `u` uniform on `(0, 1)` the
/// factor `-ln(u)` is exponentially distributed with mean `1`, so the mean
/// window is `delta * beta`.
///
/// `u` must lie strictly inside `(0, 1)` and `beta` must be non-negative;
/// otherwise the result is unspecified. A window that does not fit in a
/// `Duration` of nanoseconds saturates.
///
/// ```
/// use std::time::Duration;
/// use xfetch_entry::early_expiration_window;
///
/// let delta = Duration::from_millis(100);
/// assert_eq!(early_expiration_window(delta, 0.0, 0.5), Duration::ZERO);
/// assert!(early_expiration_window(delta, 1.0, 0.5) > Duration::ZERO);
/// ```
pub fn early_expiration_window(delta: Duration, beta: f64, u: f64) -> Duration {
    let nanos = delta.as_nanos() as f64 * beta * -u.ln();
    // `as` saturates and maps NaN to zero.
    Duration::from_nanos(nanos as u64)
}

/// Decide whether an entry with the given nominal `expiry` should be treated
/// as expired at `now`, looking `window` ahead.
///
/// An entry without an expiry never expires. If `now + window` overflows the
/// clock it is past any expiry.
pub fn is_expired_at(expiry: Option<Instant>, now: Instant, window: Duration) -> bool {
    match expiry {
        Some(expiry) => now.checked_add(window).map_or(true, |t| t > expiry),
        None => false,
    }
}
