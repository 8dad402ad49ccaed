//! Fixed-interval retry policy.

use std::time::Duration;

/// Upload attempts per file.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 7;

/// Pause between upload attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Returns true while another attempt is allowed: `attempt_index` counts
/// the attempts already made.
pub fn should_retry(attempt_index: u32, max_attempts: u32) -> bool {
    attempt_index < max_attempts
}

/// Retry eligibility and delay. No jitter and no growth: every failure
/// costs one attempt and the same pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, attempt_index: u32) -> bool {
        should_retry(attempt_index, self.max_attempts)
    }

    /// Delay before attempt number `attempt_index + 1`.
    pub fn delay_for(&self, _attempt_index: u32) -> Duration {
        self.delay
    }
}

/// Attempt counter of one task, bound to its policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Failed attempts so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    /// Whether another attempt may start.
    pub fn can_attempt(&self) -> bool {
        self.policy.should_retry(self.attempt)
    }

    /// Counts a failed attempt and returns the pause that follows it. The
    /// last attempt is followed by the same pause before the task gives up.
    pub fn record_failure(&mut self) -> Duration {
        if self.can_attempt() {
            self.attempt += 1;
        }
        self.policy.delay_for(self.attempt)
    }
}
