/// Login lockout rules
///
/// Pure decision functions for the per-account lockout state machine. An
/// account is either active or locked until some instant. Five consecutive
/// failed logins lock it for fifteen minutes; a lock in force rejects
/// attempts without looking at the password and without counting them.
///
/// The counter only resets on a successful login, an admin unlock or a
/// password reset. When a lock lapses on its own the counter is still at or
/// above the threshold, so the next failure relocks immediately.
///
/// [`crate::auth::login`] applies these rules against the database.

use chrono::{DateTime, Duration, Utc};

use crate::models::audit_log::AuditAction;

/// Consecutive failures that lock an account
pub const MAX_FAILED_LOGINS: i32 = 5;

/// How long a lock lasts, in minutes
pub const LOCK_DURATION_MINUTES: i64 = 15;

/// Whether a login attempt may proceed to password verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginGate {
    Open,
    Locked { until: DateTime<Utc> },
}

/// Gate for an account with the given lock timestamp
pub fn gate(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LoginGate {
    match locked_until {
        Some(until) if until > now => LoginGate::Locked { until },
        _ => LoginGate::Open,
    }
}

/// New lockout state after a wrong password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub failed_logins: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl FailureOutcome {
    pub fn locks_account(&self) -> bool {
        self.locked_until.is_some()
    }

    /// Audit action for this failure
    pub fn action(&self) -> AuditAction {
        if self.locks_account() {
            AuditAction::AuthLocked
        } else {
            AuditAction::AuthLoginFailed
        }
    }
}

/// Counts one more failure on top of `failed_logins`
pub fn register_failure(failed_logins: i32, now: DateTime<Utc>) -> FailureOutcome {
    let failed_logins = failed_logins.saturating_add(1);
    let locked_until = (failed_logins >= MAX_FAILED_LOGINS)
        .then(|| now + Duration::minutes(LOCK_DURATION_MINUTES));

    FailureOutcome {
        failed_logins,
        locked_until,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_open_without_lock() {
        assert_eq!(gate(None, Utc::now()), LoginGate::Open);
    }

    #[test]
    fn test_gate_locked_while_in_future() {
        let now = Utc::now();
        let until = now + Duration::minutes(5);
        assert_eq!(gate(Some(until), now), LoginGate::Locked { until });
    }

    #[test]
    fn test_gate_open_once_lock_lapses() {
        let now = Utc::now();
        assert_eq!(gate(Some(now - Duration::seconds(1)), now), LoginGate::Open);
        assert_eq!(gate(Some(now), now), LoginGate::Open);
    }

    #[test]
    fn test_first_four_failures_do_not_lock() {
        let now = Utc::now();
        let mut failed = 0;
        for expected in 1..MAX_FAILED_LOGINS {
            let outcome = register_failure(failed, now);
            assert_eq!(outcome.failed_logins, expected);
            assert_eq!(outcome.locked_until, None);
            assert_eq!(outcome.action(), AuditAction::AuthLoginFailed);
            failed = outcome.failed_logins;
        }
    }

    #[test]
    fn test_fifth_failure_locks_for_fifteen_minutes() {
        let now = Utc::now();
        let outcome = register_failure(4, now);

        assert_eq!(outcome.failed_logins, 5);
        assert_eq!(outcome.locked_until, Some(now + Duration::minutes(15)));
        assert!(outcome.locks_account());
        assert_eq!(outcome.action(), AuditAction::AuthLocked);
    }

    #[test]
    fn test_failure_after_lapsed_lock_relocks() {
        let locked_at = Utc::now();
        let first = register_failure(4, locked_at);
        let later = first.locked_until.unwrap() + Duration::seconds(1);

        assert_eq!(gate(first.locked_until, later), LoginGate::Open);

        let again = register_failure(first.failed_logins, later);
        assert_eq!(again.failed_logins, 6);
        assert_eq!(again.locked_until, Some(later + Duration::minutes(15)));
    }

    #[test]
    fn test_counter_saturates() {
        let outcome = register_failure(i32::MAX, Utc::now());
        assert_eq!(outcome.failed_logins, i32::MAX);
        assert!(outcome.locks_account());
    }
}
