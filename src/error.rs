use thiserror::Error;

/// Errors reported when checking [CacheEntryOptions](struct.CacheEntryOptions.html).
///
/// Entry construction itself never fails on its own; see
/// [`CacheEntryOptions::validate`](struct.CacheEntryOptions.html#method.validate).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Error {
    /// Beta must be a finite, non-negative number.
    #[error("beta must be finite and non-negative, got {0}")]
    InvalidBeta(f64),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
