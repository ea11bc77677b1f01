//! Reconnect Backoff - Bounded Exponential Delay with Jitter
//!
//! `delay(n) = min(cap, base * 2^n) + jitter`, with jitter drawn
//! uniformly from `[0, delay/4)`. The attempt counter is owned by the
//! caller and reset on every successful connect.

use std::time::Duration;

use rand::Rng;

/// Exponent beyond which `base * 2^n` is always past any sane cap.
const MAX_EXPONENT: u32 = 31;

/// Bounded exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Create a policy. Callers validate `base <= cap` through config.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
        }
    }

    pub const fn base(&self) -> Duration {
        self.base
    }

    pub const fn cap(&self) -> Duration {
        self.cap
    }

    /// Un-jittered delay for the given attempt: `min(cap, base * 2^attempt)`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_EXPONENT);
        self.base
            .checked_mul(factor)
            .map_or(self.cap, |d| d.min(self.cap))
    }

    /// First attempt whose ceiling reaches the cap.
    pub fn attempts_to_cap(&self) -> u32 {
        (0..MAX_EXPONENT)
            .find(|&attempt| self.ceiling(attempt) >= self.cap)
            .unwrap_or(MAX_EXPONENT)
    }

    /// Largest jitter that can ever be added.
    pub fn max_jitter(&self) -> Duration {
        self.cap / 4
    }

    /// Jittered delay for the given attempt.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.ceiling(attempt);
        let spread = u64::try_from((ceiling / 4).as_nanos()).unwrap_or(u64::MAX);
        if spread == 0 {
            return ceiling;
        }
        ceiling + Duration::from_nanos(rng.gen_range(0..spread))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(30))
    }
}
