//! Provider call throttle built on governor.
//!
//! Replaces ad-hoc inter-call sleeps with an explicit, injectable object:
//! each reader that must respect a provider ceiling owns one throttle with
//! a configured minimum interval between calls.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Enforces a minimum spacing between successive calls to one provider.
pub struct ProviderThrottle {
    limiter: DefaultDirectRateLimiter,
    interval: Duration,
}

impl ProviderThrottle {
    /// Create a throttle with the given minimum inter-call interval.
    /// A zero interval yields an effectively unlimited throttle.
    pub fn new(interval: Duration) -> Self {
        let period = if interval.is_zero() {
            Duration::from_nanos(1)
        } else {
            interval
        };
        let one = NonZeroU32::new(1).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(one))
            .allow_burst(one);

        Self {
            limiter: RateLimiter::direct(quota),
            interval,
        }
    }

    /// Wait until the next call is allowed, then consume the slot.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
        debug!("Provider call slot acquired (interval {:?})", self.interval);
    }

    /// Non-blocking check; used by tests to observe throttle state without
    /// real sleeps.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_is_immediate() {
        let throttle = ProviderThrottle::new(Duration::from_millis(250));
        assert!(throttle.try_acquire());
    }

    #[test]
    fn test_second_call_within_interval_is_blocked() {
        let throttle = ProviderThrottle::new(Duration::from_secs(60));
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn test_zero_interval_never_blocks() {
        let throttle = ProviderThrottle::new(Duration::ZERO);
        for _ in 0..10 {
            assert!(throttle.try_acquire());
        }
    }

    #[tokio::test]
    async fn test_acquire_completes() {
        let throttle = ProviderThrottle::new(Duration::from_millis(1));
        throttle.acquire().await;
        throttle.acquire().await;
    }

    #[test]
    fn test_interval_is_exposed() {
        let throttle = ProviderThrottle::new(Duration::from_millis(250));
        assert_eq!(throttle.interval(), Duration::from_millis(250));
    }
}
