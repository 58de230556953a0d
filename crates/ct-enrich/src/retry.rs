// retry.rs — Bounded exponential backoff around a generation call.
//
// Transient failures are retried up to `max_attempts` total attempts with
// delays initial, initial*m, initial*m^2, ... capped at `max_delay`.
// Permanent failures return immediately. A run deadline, when set, is never
// overslept: a retry whose delay would cross it is abandoned.

use std::time::{Duration, Instant};

use crate::error::GenerationError;
use crate::generator::MessageGenerator;
use crate::record::FailureReason;

/// Backoff schedule for transient generation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1 in practice.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Same attempt cap, no waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1 = the wait after the first
    /// failed attempt).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }
}

/// Text produced by a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub text: String,
    pub attempts: u32,
}

/// Why a generation call gave up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    /// `TransientExhausted` or `Permanent`.
    pub reason: FailureReason,
    pub attempts: u32,
    pub last_error: GenerationError,
}

/// Call `generator` under `policy`, sleeping between attempts with `sleep`.
pub fn generate_with_retry(
    generator: &dyn MessageGenerator,
    prompt: &str,
    max_tokens: u32,
    policy: &RetryPolicy,
    deadline: Option<Instant>,
    sleep: &dyn Fn(Duration),
) -> Result<Generated, RetryFailure> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let error = match generator.generate(prompt, max_tokens) {
            Ok(text) => {
                return Ok(Generated {
                    text,
                    attempts: attempt,
                })
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            return Err(RetryFailure {
                reason: FailureReason::Permanent,
                attempts: attempt,
                last_error: error,
            });
        }

        if attempt >= max_attempts {
            return Err(RetryFailure {
                reason: FailureReason::TransientExhausted,
                attempts: attempt,
                last_error: error,
            });
        }

        let delay = policy.delay_for(attempt);
        let past_deadline = deadline.is_some_and(|d| {
            Instant::now()
                .checked_add(delay)
                .map_or(true, |resume| resume >= d)
        });
        if past_deadline {
            tracing::warn!(attempt, "run budget reached, not retrying");
            return Err(RetryFailure {
                reason: FailureReason::TransientExhausted,
                attempts: attempt,
                last_error: error,
            });
        }

        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "transient generation failure, backing off"
        );
        sleep(delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails transiently `failures` times, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MessageGenerator for Flaky {
        fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(GenerationError::transient("throttled"))
            } else {
                Ok("Keep going!".to_string())
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    struct Rejecting {
        calls: AtomicU32,
    }

    impl MessageGenerator for Rejecting {
        fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GenerationError::permanent("bad request"))
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    fn no_sleep(_: Duration) {}

    fn forbid_sleep(_: Duration) {
        panic!("must not sleep past the deadline");
    }

    #[test]
    fn delays_grow_exponentially_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(60), Duration::from_secs(3));
    }

    #[test]
    fn succeeds_after_cap_minus_one_transient_failures() {
        let generator = Flaky::new(2);
        let policy = RetryPolicy::immediate(3);
        let generated =
            generate_with_retry(&generator, "p", 200, &policy, None, &no_sleep).unwrap();
        assert_eq!(generated.text, "Keep going!");
        assert_eq!(generated.attempts, 3);
        assert_eq!(generator.calls(), 3);
    }

    #[test]
    fn exhausts_after_cap_transient_failures() {
        let generator = Flaky::new(3);
        let policy = RetryPolicy::immediate(3);
        let failure =
            generate_with_retry(&generator, "p", 200, &policy, None, &no_sleep).unwrap_err();
        assert_eq!(failure.reason, FailureReason::TransientExhausted);
        assert_eq!(failure.attempts, 3);
        assert_eq!(generator.calls(), 3);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let generator = Rejecting {
            calls: AtomicU32::new(0),
        };
        let failure = generate_with_retry(
            &generator,
            "p",
            200,
            &RetryPolicy::immediate(3),
            None,
            &no_sleep,
        )
        .unwrap_err();
        assert_eq!(failure.reason, FailureReason::Permanent);
        assert_eq!(failure.attempts, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sleeps_follow_backoff_schedule() {
        let generator = Flaky::new(2);
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(1),
        };
        let slept = RefCell::new(Vec::new());
        let record = |d: Duration| slept.borrow_mut().push(d);

        generate_with_retry(&generator, "p", 200, &policy, None, &record).unwrap();
        assert_eq!(
            *slept.borrow(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn deadline_stops_retrying() {
        let generator = Flaky::new(5);
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_delay: Duration::from_secs(120),
        };
        let deadline = Instant::now() + Duration::from_secs(1);
        let failure =
            generate_with_retry(&generator, "p", 200, &policy, Some(deadline), &forbid_sleep)
                .unwrap_err();
        assert_eq!(failure.reason, FailureReason::TransientExhausted);
        assert_eq!(failure.attempts, 1);
    }

    #[test]
    fn unrepresentable_backoff_counts_as_past_deadline() {
        let generator = Flaky::new(5);
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::MAX,
            multiplier: 2.0,
            max_delay: Duration::MAX,
        };
        let deadline = Instant::now() + Duration::from_secs(3600);
        let failure =
            generate_with_retry(&generator, "p", 200, &policy, Some(deadline), &forbid_sleep)
                .unwrap_err();
        assert_eq!(failure.reason, FailureReason::TransientExhausted);
        assert_eq!(failure.attempts, 1);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let generator = Flaky::new(0);
        let generated = generate_with_retry(
            &generator,
            "p",
            200,
            &RetryPolicy::immediate(0),
            None,
            &no_sleep,
        )
        .unwrap();
        assert_eq!(generated.attempts, 1);
    }
}
