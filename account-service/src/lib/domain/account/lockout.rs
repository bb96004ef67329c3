use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::account::models::LoginCounters;

/// Consecutive wrong passwords that lock an account (inclusive).
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Fixed lockout window measured from the failure that triggered it.
pub const LOCKOUT_DURATION_MS: i64 = 15 * 60 * 1000;

/// Shortest secret worth a store lookup.
pub const MIN_SECRET_LENGTH: usize = 8;

/// Brute-force protection rules applied by the authenticator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
    /// Attempts at a conflicting counter write before giving up.
    pub max_update_retries: u32,
    /// When true, a correct password clears the counters of an inactive
    /// account before it is denied as inactive. When false the inactive
    /// denial comes first and leaves the counters untouched.
    pub reset_before_active_check: bool,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            lockout_duration: Duration::milliseconds(LOCKOUT_DURATION_MS),
            max_update_retries: 10,
            reset_before_active_check: true,
        }
    }
}

impl LockoutPolicy {
    /// Whether `counters` hold a lock that is still in force at `now`.
    pub fn is_locked(&self, counters: &LoginCounters, now: DateTime<Utc>) -> bool {
        counters.locked_until.is_some_and(|until| until > now)
    }

    /// Counters after one more wrong password at `now`.
    ///
    /// The lock is set only when the new count reaches the threshold and is
    /// cleared otherwise, so an expired lock does not linger on the record.
    pub fn after_failure(&self, counters: &LoginCounters, now: DateTime<Utc>) -> LoginCounters {
        let failed_login_count = counters.failed_login_count.saturating_add(1);
        let locked_until = if failed_login_count >= self.max_failed_attempts {
            Some(now + self.lockout_duration)
        } else {
            None
        };

        LoginCounters {
            failed_login_count,
            last_failed_login: Some(now),
            locked_until,
        }
    }
}
