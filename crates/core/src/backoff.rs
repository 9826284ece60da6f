//! Delay policies between upload attempts
//!
//! The uploader asks a [`Backoff`] how long to sleep before each retry.
//! [`FixedBackoff`] is the default; [`ExponentialBackoff`] doubles the delay
//! up to a cap. Neither adds jitter.

use std::time::Duration;

/// Default delay between upload attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Policy deciding the sleep before a retry
pub trait Backoff: Send + Sync {
    /// Delay before retry number `retry` (1 for the first retry)
    fn delay(&self, retry: u32) -> Duration;
}

/// The same delay before every retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF)
    }
}

impl Backoff for FixedBackoff {
    fn delay(&self, _retry: u32) -> Duration {
        self.delay
    }
}

/// Doubling delay starting at `initial`, never above `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl<B: Backoff + ?Sized> Backoff for Box<B> {
    fn delay(&self, retry: u32) -> Duration {
        (**self).delay(retry)
    }
}

impl<B: Backoff + ?Sized> Backoff for std::sync::Arc<B> {
    fn delay(&self, retry: u32) -> Duration {
        (**self).delay(retry)
    }
}
