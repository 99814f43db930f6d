//! Retry bound and exponential backoff schedule for inference calls.

use crate::constants::{
    BACKOFF_MULTIPLIER, DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_MAX_ATTEMPTS,
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// How many times an inference call is attempted and how long to wait in between.
///
/// The wait after failed attempt `n` is `base_delay * 2^(n - 1)`, capped at
/// `max_delay`, with no jitter. A server supplied `Retry-After` hint replaces
/// the computed wait for that retry (still capped) and does not advance the
/// schedule.
///
/// # Examples
///
/// ```
/// use backoff::backoff::Backoff;
/// use moodlog::ai::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(500), Duration::from_secs(8));
/// let mut schedule = policy.backoff();
/// assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(500)));
/// assert_eq!(schedule.next_backoff(), Some(Duration::from_millis(1000)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        )
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` counts the first call; zero is raised to one.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        RetryPolicy::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// A fresh wait schedule for one call.
    ///
    /// The schedule never runs out on its own; the attempt bound is enforced
    /// by the caller.
    pub fn backoff(&self) -> ExponentialBackoff {
        let mut builder = ExponentialBackoffBuilder::default();
        builder
            .with_initial_interval(self.base_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(BACKOFF_MULTIPLIER)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None);
        builder.build()
    }

    /// Bounds a server supplied wait by `max_delay`.
    pub fn clamp_hint(&self, hint: Duration) -> Duration {
        hint.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::backoff::Backoff;

    fn schedule_ms(policy: &RetryPolicy, steps: usize) -> Vec<u64> {
        let mut schedule = policy.backoff();
        (0..steps)
            .map(|_| schedule.next_backoff().unwrap().as_millis() as u64)
            .collect()
    }

    #[test]
    fn test_exponential_schedule_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(500), Duration::from_secs(8));
        assert_eq!(
            schedule_ms(&policy, 7),
            vec![500, 1000, 2000, 4000, 8000, 8000, 8000]
        );
    }

    #[test]
    fn test_long_schedules_stay_at_the_cap() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30));
        let delays = schedule_ms(&policy, 200);
        assert_eq!(delays.last(), Some(&30_000));
        assert!(delays.iter().all(|d| *d <= 30_000));
    }

    #[test]
    fn test_schedule_restarts_for_each_call() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(5));
        assert_eq!(schedule_ms(&policy, 2), vec![100, 200]);
        assert_eq!(schedule_ms(&policy, 2), vec![100, 200]);
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(5));
        assert_eq!(policy.clamp_hint(Duration::from_secs(2)), Duration::from_secs(2));
        assert_eq!(policy.clamp_hint(Duration::from_secs(60)), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
        assert_eq!(schedule_ms(&RetryPolicy::no_retry(), 2), vec![0, 0]);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.max_delay(), Duration::from_secs(8));
        assert_eq!(schedule_ms(&policy, 1), vec![500]);
    }
}
