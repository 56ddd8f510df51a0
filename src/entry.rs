use crate::oracle;
use crate::options::{CacheEntryOptions, Ttl};
use rand::{distributions::Open01, thread_rng, Rng};
use std::time::{Duration, Instant};
use tracing::trace;

/// The builder for building [CacheEntry](struct.CacheEntry.html) with
/// supplied parameters.
///
/// The value has already been computed when the builder exists; the
/// remaining parameters are applied once by
/// [`build()`](#method.build).
pub struct CacheEntryBuilder<T> {
    value: T,
    computed_at: Instant,
    recompute_time: Duration,
    options: CacheEntryOptions,
}

impl<T> CacheEntryBuilder<T> {
    /// Set the beta value.
    ///
    /// Beta value > `1.0` favors more eager early expiration, value < `1.0`
    /// favors lazier early expiration. `0.0` disables early expiration and
    /// leaves a plain TTL.
    ///
    /// The default value `1.0` is usually the optimal value for most use cases.
    pub fn with_beta(mut self, beta: f64) -> CacheEntryBuilder<T> {
        self.options.beta = Some(beta);
        self
    }

    /// Set the delta.
    ///
    /// Usually the delta value is measured from the time taken by the
    /// recomputation function. However, if the recomputation function does not
    /// reflect the actual time required (for example, an asynchronous
    /// computation), then the delta value can be set via this method.
    ///
    /// The reference of the value returned by the recomputation function is
    /// passed to the closure.
    pub fn with_delta<F>(mut self, f: F) -> CacheEntryBuilder<T>
    where
        F: FnOnce(&T) -> Duration,
    {
        self.options.delta = Some(f(&self.value));
        self
    }

    /// Set the ttl.
    ///
    /// The reference of the value returned by the recomputation function is
    /// passed to the closure. The ttl counts from the moment the
    /// recomputation function returned.
    ///
    /// If the ttl is not set, or is zero, then the cache entry will become an
    /// eternal cache entry that will never expire.
    pub fn with_ttl<F>(mut self, f: F) -> CacheEntryBuilder<T>
    where
        F: FnOnce(&T) -> Duration,
    {
        self.options.ttl = Ttl::After(f(&self.value));
        self
    }

    /// Replace all parameters with `options`.
    pub fn with_options(mut self, options: CacheEntryOptions) -> CacheEntryBuilder<T> {
        self.options = options;
        self
    }

    /// Return a new [CacheEntry](struct.CacheEntry.html) with the supplied
    /// parameters.
    pub fn build(self) -> CacheEntry<T> {
        let CacheEntryBuilder {
            value,
            computed_at,
            recompute_time,
            options,
        } = self;
        let delta = options.delta.unwrap_or(recompute_time);
        let beta = options.beta_or_default();
        let expiry = options.ttl.expiry_from(computed_at);
        trace!(
            ?recompute_time,
            ?delta,
            beta,
            ttl = ?options.ttl,
            eternal = expiry.is_none(),
            "built cache entry"
        );
        CacheEntry {
            value,
            delta,
            beta,
            expiry,
        }
    }
}

/// A cache entry that employs probabilistic early expiration
///
/// Entries are immutable. They can be shared between threads (e.g. behind an
/// `Arc`) and checked concurrently without locking.
///
/// # Examples
///
/// In this example, you can see how to create a new cache entry. The value of
/// the entry is passed in as a closure so the time required for recomputation
/// can be measured. The time to expiration can be set by chaining the
/// [`with_ttl()`](struct.CacheEntryBuilder.html#method.with_ttl) method.
///
/// ```
/// use std::time::Duration;
/// use xfetch_entry::CacheEntry;
///
/// let entry = CacheEntry::builder(|| 42)
///     .with_ttl(|_| Duration::from_secs(10))
///     .build();
/// assert_eq!(*entry.get(), 42);
/// ```
///
/// See the [module-level documentation](index.html) for more information.
#[derive(Copy, Clone, Debug)]
pub struct CacheEntry<T> {
    value: T,
    delta: Duration,
    beta: f64,
    expiry: Option<Instant>,
}

impl<T> CacheEntry<T> {
    /// Return a new [CacheEntryBuilder](struct.CacheEntryBuilder.html).
    ///
    /// This method takes a closure which should return the value to be cached.
    /// The closure runs exactly once, right away, and its running time becomes
    /// the default delta.
    pub fn builder<F>(f: F) -> CacheEntryBuilder<T>
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let value = f();
        let computed_at = Instant::now();
        CacheEntryBuilder {
            value,
            computed_at,
            recompute_time: computed_at - start,
            options: CacheEntryOptions::default(),
        }
    }

    /// Like [`builder()`](#method.builder) for a fallible computation.
    ///
    /// An error from the closure is returned as is; nothing is retried.
    ///
    /// ```
    /// use xfetch_entry::CacheEntry;
    ///
    /// let entry = CacheEntry::try_builder(|| "42".parse::<u32>());
    /// assert_eq!(*entry.unwrap().build().get(), 42);
    ///
    /// let entry = CacheEntry::try_builder(|| "forty-two".parse::<u32>());
    /// assert!(entry.is_err());
    /// ```
    pub fn try_builder<F, E>(f: F) -> Result<CacheEntryBuilder<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let CacheEntryBuilder {
            value,
            computed_at,
            recompute_time,
            options,
        } = CacheEntry::builder(f);
        Ok(CacheEntryBuilder {
            value: value?,
            computed_at,
            recompute_time,
            options,
        })
    }

    /// Compute the value and build the entry with `options` in one step.
    ///
    /// The computation is timed even when `options` overrides the delta.
    pub fn with_options<F>(f: F, options: CacheEntryOptions) -> CacheEntry<T>
    where
        F: FnOnce() -> T,
    {
        CacheEntry::builder(f).with_options(options).build()
    }

    /// Like [`with_options()`](#method.with_options) for a fallible
    /// computation.
    pub fn try_with_options<F, E>(f: F, options: CacheEntryOptions) -> Result<CacheEntry<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        Ok(CacheEntry::try_builder(f)?.with_options(options).build())
    }

    /// Check whether the cache entry is expired at `now`, drawing the random
    /// sample from `rng`.
    ///
    /// Eternal entries return `false` without touching `rng`; otherwise
    /// exactly one sample is drawn.
    pub fn is_expired_at<R>(&self, now: Instant, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        let expiry = match self.expiry {
            Some(expiry) => expiry,
            None => return false,
        };
        let u: f64 = rng.sample(Open01);
        let window = oracle::early_expiration_window(self.delta, self.beta, u);
        let expired = oracle::is_expired_at(Some(expiry), now, window);
        if expired && now <= expiry {
            trace!(?window, until_expiry = ?(expiry - now), "early expiration");
        }
        expired
    }

    /// Check whether the cache entry is expired now, drawing the random
    /// sample from `rng`.
    pub fn is_expired_with_rng<R>(&self, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        self.is_expired_at(Instant::now(), rng)
    }

    /// Check whether the cache has expired or not.
    ///
    /// With probabilistic early expiration, this method may return `true` before
    /// the entry is really expired, and two calls made at the same moment may
    /// disagree.
    ///
    /// The random sample comes from [`rand::thread_rng`], which is local to
    /// the calling thread, so concurrent callers never share generator state.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_rng(&mut thread_rng())
    }

    /// Check if the cache entry will never expire.
    ///
    /// If the cache entry is created without setting time to expiration then it
    /// is an eternal cache entry.
    pub fn is_eternal(&self) -> bool {
        self.expiry.is_none()
    }

    /// Returns the recomputation time used to scale early expiration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Returns the beta value.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Returns the nominal expiry instant, or `None` for an eternal entry.
    pub fn expiry(&self) -> Option<Instant> {
        self.expiry
    }

    /// Returns a reference of the contained value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Unwraps the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_BETA;
    use rand::rngs::mock::StepRng;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    /// An rng that fails the test if it is ever asked for a value.
    struct UnusedRng;

    impl RngCore for UnusedRng {
        fn next_u32(&mut self) -> u32 {
            panic!("rng used")
        }
        fn next_u64(&mut self) -> u64 {
            panic!("rng used")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("rng used")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            panic!("rng used")
        }
    }

    #[test]
    fn test_new_entry() {
        let entry = CacheEntry::builder(|| ()).build();
        assert_eq!(*entry.get(), ());
        assert!(entry.is_eternal());
        assert_eq!(entry.beta, DEFAULT_BETA);
        assert_eq!(entry.into_inner(), ());
    }

    #[test]
    fn test_new_entry_with_ttl() {
        let entry = CacheEntry::builder(|| ())
            .with_ttl(|_| Duration::from_secs(60))
            .build();
        assert_eq!(*entry.get(), ());
        assert!(entry.expiry.is_some());
    }

    #[test]
    fn test_ttl_from_value() {
        let entry = CacheEntry::builder(|| 30u64)
            .with_ttl(|v| Duration::from_secs(*v))
            .build();
        let remaining = entry.expiry.unwrap() - Instant::now();
        assert!(remaining <= Duration::from_secs(30));
        assert!(remaining > Duration::from_secs(29));
    }

    #[test]
    fn test_new_entry_with_beta() {
        let entry = CacheEntry::builder(|| ()).with_beta(0.9).build();
        assert_eq!(*entry.get(), ());
        assert_eq!(entry.beta, 0.9);
    }

    #[test]
    fn test_builder_setters_after_options() {
        let entry = CacheEntry::builder(|| ())
            .with_options(CacheEntryOptions::new().beta(3.0))
            .with_delta(|_| Duration::from_millis(7))
            .build();
        assert_eq!(entry.beta, 3.0);
        assert_eq!(entry.delta, Duration::from_millis(7));
        assert!(entry.is_eternal());
    }

    #[test]
    fn test_elapsed_ttl_is_expired() {
        let entry = CacheEntry::with_options(
            || (),
            CacheEntryOptions::new().ttl(Ttl::Elapsed(Duration::from_secs(1))),
        );
        assert!(!entry.is_eternal());
        assert!(entry.is_expired_with_rng(&mut StepRng::new(!0, 0)));
    }

    #[test]
    fn test_try_builder_propagates_error() {
        let result: Result<CacheEntryBuilder<u32>, &str> = CacheEntry::try_builder(|| Err("boom"));
        assert_eq!(result.err(), Some("boom"));

        let result = CacheEntry::try_with_options(
            || Err::<u32, _>("boom"),
            CacheEntryOptions::new().ttl(Duration::from_secs(1)),
        );
        assert_eq!(result.err(), Some("boom"));
    }

    #[test]
    fn test_early_expiry() {
        let mut zeros = StepRng::new(0, 0);
        let entry = CacheEntry::builder(|| ())
            .with_delta(|_| Duration::from_secs(10))
            .with_ttl(|_| Duration::from_secs(120))
            .build();
        assert!(entry.is_expired_with_rng(&mut zeros));
    }

    #[test]
    fn test_no_early_expiry() {
        let mut max = StepRng::new(!0, 0);
        let entry = CacheEntry::builder(|| ())
            .with_delta(|_| Duration::from_secs(10))
            .with_ttl(|_| Duration::from_secs(120))
            .build();
        assert!(!entry.is_expired_with_rng(&mut max));
    }

    #[test]
    fn test_eternal_entry_skips_rng() {
        let entry = CacheEntry::builder(|| ())
            .with_delta(|_| Duration::from_secs(10))
            .build();
        let far_future = Instant::now() + Duration::from_secs(1_000_000);
        assert!(!entry.is_expired_at(far_future, &mut UnusedRng));
    }

    #[test]
    fn test_zero_beta_is_hard_ttl() {
        let entry = CacheEntry::builder(|| ())
            .with_beta(0.0)
            .with_delta(|_| Duration::from_secs(10))
            .with_ttl(|_| Duration::from_secs(120))
            .build();
        let expiry = entry.expiry.unwrap();
        let mut zeros = StepRng::new(0, 0);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(!entry.is_expired_at(expiry, &mut zeros));
            assert!(!entry.is_expired_at(expiry, &mut rng));
            assert!(entry.is_expired_at(expiry + Duration::from_nanos(1), &mut rng));
        }
    }

    #[test]
    fn test_zero_delta_is_hard_ttl() {
        let entry = CacheEntry::builder(|| ())
            .with_delta(|_| Duration::ZERO)
            .with_ttl(|_| Duration::from_secs(120))
            .build();
        let expiry = entry.expiry.unwrap();
        let mut zeros = StepRng::new(0, 0);
        assert!(!entry.is_expired_at(expiry, &mut zeros));
        assert!(entry.is_expired_at(expiry + Duration::from_nanos(1), &mut zeros));
    }

    #[test]
    fn test_early_expiry_probability_rises() {
        let entry = CacheEntry::builder(|| ())
            .with_delta(|_| Duration::from_secs(1))
            .with_ttl(|_| Duration::from_secs(60))
            .build();
        let expiry = entry.expiry.unwrap();
        let mut rng = StdRng::seed_from_u64(2015);
        let mut rate = |before: Duration| {
            let now = expiry - before;
            (0..10_000)
                .filter(|_| entry.is_expired_at(now, &mut rng))
                .count()
        };
        // P(expired) = exp(-before / delta)
        let far = rate(Duration::from_secs(30));
        let near = rate(Duration::from_secs(1));
        let at = rate(Duration::from_millis(10));
        assert_eq!(far, 0);
        assert!(near > 3_000 && near < 4_400, "near = {}", near);
        assert!(at > 9_700, "at = {}", at);
    }
}
