use crate::error::{Error, Result};
use std::time::{Duration, Instant};
use tracing::debug;

/// The default beta value.
pub const DEFAULT_BETA: f64 = 1.0;

/// Time to live of a cache entry.
///
/// The nominal expiry instant is measured from the moment the value
/// computation returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Ttl {
    /// The entry never expires.
    #[default]
    Never,
    /// The entry expires this long after the value was computed.
    ///
    /// A zero duration means the entry never expires.
    After(Duration),
    /// The entry expired this long before the value was computed, so it is
    /// born expired.
    ///
    /// A zero duration means the entry never expires.
    Elapsed(Duration),
}

impl Ttl {
    /// Resolve the nominal expiry relative to `anchor`.
    pub(crate) fn expiry_from(self, anchor: Instant) -> Option<Instant> {
        match self {
            Ttl::Never => None,
            Ttl::After(ttl) | Ttl::Elapsed(ttl) if ttl.is_zero() => None,
            Ttl::After(ttl) => {
                let expiry = anchor.checked_add(ttl);
                if expiry.is_none() {
                    debug!(?ttl, "ttl overflows the clock, entry will never expire");
                }
                expiry
            }
            // Clamping to the anchor still leaves the entry expired for every
            // later reading of the clock.
            Ttl::Elapsed(ago) => Some(anchor.checked_sub(ago).unwrap_or(anchor)),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Ttl {
        Ttl::After(ttl)
    }
}

/// Parameters applied once when a [CacheEntry](struct.CacheEntry.html) is
/// created.
///
/// Every field is optional:
///
/// | field   | default                                  |
/// |---------|------------------------------------------|
/// | `delta` | measured duration of the value function  |
/// | `beta`  | [`DEFAULT_BETA`](constant.DEFAULT_BETA.html) (`1.0`) |
/// | `ttl`   | [`Ttl::Never`](enum.Ttl.html#variant.Never) |
///
/// ```
/// use std::time::Duration;
/// use xfetch_entry::{CacheEntry, CacheEntryOptions};
///
/// let options = CacheEntryOptions::new()
///     .beta(2.0)
///     .ttl(Duration::from_secs(30));
/// let entry = CacheEntry::with_options(|| "value", options);
/// assert_eq!(entry.beta(), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheEntryOptions {
    /// Override for the recomputation time.
    pub delta: Option<Duration>,
    /// Scaling of the early expiration window.
    pub beta: Option<f64>,
    /// Time to live.
    pub ttl: Ttl,
}

impl CacheEntryOptions {
    /// Options with every field left at its default.
    pub fn new() -> CacheEntryOptions {
        CacheEntryOptions::default()
    }

    /// Set the delta, overriding the measured recomputation time.
    pub fn delta(mut self, delta: Duration) -> CacheEntryOptions {
        self.delta = Some(delta);
        self
    }

    /// Set the beta value.
    pub fn beta(mut self, beta: f64) -> CacheEntryOptions {
        self.beta = Some(beta);
        self
    }

    /// Set the time to live.
    pub fn ttl(mut self, ttl: impl Into<Ttl>) -> CacheEntryOptions {
        self.ttl = ttl.into();
        self
    }

    /// Check that the options are usable.
    ///
    /// Constructors do not call this. A negative or NaN beta is a caller
    /// error and the resulting expiration behavior is unspecified; call this
    /// on options that come from configuration files.
    pub fn validate(&self) -> Result<()> {
        match self.beta {
            Some(beta) if !beta.is_finite() || beta < 0.0 => Err(Error::InvalidBeta(beta)),
            _ => Ok(()),
        }
    }

    pub(crate) fn beta_or_default(&self) -> f64 {
        self.beta.unwrap_or(DEFAULT_BETA)
    }
}
