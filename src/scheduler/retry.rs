//! Bounded retry with a configurable wait between attempts.

use std::time::Duration;

/// How the wait grows from one attempt to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// `interval * attempt`
    Linear,
    /// `interval` every time
    Fixed,
    /// `interval * 2^(attempt - 1)`
    Exponential,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub interval: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Run once, never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            interval: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Linear => self.interval.saturating_mul(attempt),
            Backoff::Fixed => self.interval,
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.interval.saturating_mul(factor)
            }
        }
    }

    /// Whether another attempt follows failed attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(600),
            backoff: Backoff::Linear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(backoff: Backoff) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            interval: Duration::from_secs(60),
            backoff,
        }
    }

    #[test]
    fn test_linear_grows_with_attempt() {
        let p = policy(Backoff::Linear);
        assert_eq!(p.delay_after(1), Duration::from_secs(60));
        assert_eq!(p.delay_after(2), Duration::from_secs(120));
        assert_eq!(p.delay_after(3), Duration::from_secs(180));
    }

    #[test]
    fn test_fixed_and_exponential() {
        assert_eq!(policy(Backoff::Fixed).delay_after(3), Duration::from_secs(60));

        let p = policy(Backoff::Exponential);
        assert_eq!(p.delay_after(1), Duration::from_secs(60));
        assert_eq!(p.delay_after(2), Duration::from_secs(120));
        assert_eq!(p.delay_after(4), Duration::from_secs(480));
        // Saturates instead of overflowing.
        assert_eq!(p.delay_after(200), Duration::from_secs(60).saturating_mul(u32::MAX));
    }

    #[test]
    fn test_should_retry_is_bounded() {
        let p = policy(Backoff::Linear);
        assert!(p.should_retry(1));
        assert!(p.should_retry(3));
        assert!(!p.should_retry(4));
        assert!(!RetryPolicy::none().should_retry(1));
    }
}
