use chrono::DateTime;
use chrono::Utc;

use super::policy::LockoutPolicy;

/// Lockout columns of a principal record.
///
/// Invariant: `lock_until.is_some()` implies `is_locked`. A permanent
/// (administrative) lock is `is_locked` with no `lock_until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockoutFields {
    pub failed_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub is_locked: bool,
}

/// Derived lockout view of a principal at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    /// No failures on record, login permitted
    Open,
    /// Some failures, still below the threshold
    Warning { attempts: u32 },
    /// Threshold reached, locked until the given instant
    LockedTemporary { until: DateTime<Utc> },
    /// Locked by an administrator, no expiry
    LockedPermanent,
}

impl LockoutState {
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            LockoutState::LockedTemporary { .. } | LockoutState::LockedPermanent
        )
    }
}

/// Why a failure could not be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockedOut {
    Temporary { until: DateTime<Utc> },
    Permanent,
}

/// Result of counting a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Counted, account still open
    Counted { attempts: u32 },
    /// This failure reached the threshold
    Locked { until: DateTime<Utc> },
}

/// Classify lockout fields at `now`.
///
/// This is the only place lock expiry is compared against the clock. An
/// expired temporary lock classifies as `Open`; persisting the reset is left
/// to the caller.
pub fn classify(fields: &LockoutFields, now: DateTime<Utc>) -> LockoutState {
    if fields.is_locked || fields.lock_until.is_some() {
        return match fields.lock_until {
            None => LockoutState::LockedPermanent,
            Some(until) if until > now => LockoutState::LockedTemporary { until },
            Some(_) => LockoutState::Open,
        };
    }

    match fields.failed_attempts {
        0 => LockoutState::Open,
        attempts => LockoutState::Warning { attempts },
    }
}

impl LockoutFields {
    pub fn state(&self, now: DateTime<Utc>) -> LockoutState {
        classify(self, now)
    }

    /// Clear a temporary lock whose time has passed.
    ///
    /// # Returns
    /// `true` if the fields changed and need persisting
    pub fn expire_lock(&mut self, now: DateTime<Utc>) -> bool {
        let lock_on_record = self.is_locked || self.lock_until.is_some();
        if lock_on_record && classify(self, now) == LockoutState::Open {
            *self = Self::default();
            return true;
        }
        false
    }

    /// Count a failed login.
    ///
    /// # Errors
    /// * `LockedOut` - Account is already locked; nothing is counted
    pub fn register_failure(
        &mut self,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, LockedOut> {
        match classify(self, now) {
            LockoutState::LockedPermanent => return Err(LockedOut::Permanent),
            LockoutState::LockedTemporary { until } => return Err(LockedOut::Temporary { until }),
            LockoutState::Open | LockoutState::Warning { .. } => {}
        }

        self.expire_lock(now);
        self.failed_attempts = self.failed_attempts.saturating_add(1);

        if self.failed_attempts >= policy.max_attempts {
            let until = now + policy.lock_duration;
            self.is_locked = true;
            self.lock_until = Some(until);
            return Ok(FailureOutcome::Locked { until });
        }

        Ok(FailureOutcome::Counted {
            attempts: self.failed_attempts,
        })
    }

    /// Record a successful login: reset the counter and lift a temporary lock.
    ///
    /// A permanent lock is left in place.
    ///
    /// # Returns
    /// `true` if the fields changed and need persisting
    pub fn register_success(&mut self) -> bool {
        let before = *self;
        if self.lock_until.is_some() {
            self.lock_until = None;
            self.is_locked = false;
        }
        self.failed_attempts = 0;
        *self != before
    }

    /// Administrative permanent lock.
    pub fn block(&mut self) {
        self.is_locked = true;
        self.lock_until = None;
    }

    /// Administrative unlock; also forgets past failures.
    pub fn unblock(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::default()
    }

    #[test]
    fn test_classify_open_and_warning() {
        let now = Utc::now();
        let mut fields = LockoutFields::default();
        assert_eq!(classify(&fields, now), LockoutState::Open);

        fields.failed_attempts = 3;
        assert_eq!(classify(&fields, now), LockoutState::Warning { attempts: 3 });
    }

    #[test]
    fn test_classify_locks() {
        let now = Utc::now();
        let until = now + Duration::minutes(10);

        let temporary = LockoutFields {
            failed_attempts: 5,
            lock_until: Some(until),
            is_locked: true,
        };
        assert_eq!(
            classify(&temporary, now),
            LockoutState::LockedTemporary { until }
        );
        assert_eq!(classify(&temporary, until), LockoutState::Open);

        let permanent = LockoutFields {
            failed_attempts: 0,
            lock_until: None,
            is_locked: true,
        };
        assert_eq!(classify(&permanent, now), LockoutState::LockedPermanent);
        assert!(classify(&permanent, now + Duration::days(365)).is_locked());
    }

    #[test]
    fn test_threshold_locks_on_fifth_failure() {
        let now = Utc::now();
        let mut fields = LockoutFields::default();

        for attempt in 1..=4 {
            assert_eq!(
                fields.register_failure(&policy(), now),
                Ok(FailureOutcome::Counted { attempts: attempt })
            );
        }
        assert_eq!(fields.state(now), LockoutState::Warning { attempts: 4 });

        let until = now + Duration::minutes(15);
        assert_eq!(
            fields.register_failure(&policy(), now),
            Ok(FailureOutcome::Locked { until })
        );
        assert_eq!(fields.state(now), LockoutState::LockedTemporary { until });
        assert_eq!(fields.failed_attempts, 5);
    }

    #[test]
    fn test_failure_while_locked_is_not_counted() {
        let now = Utc::now();
        let until = now + Duration::minutes(15);
        let mut fields = LockoutFields {
            failed_attempts: 5,
            lock_until: Some(until),
            is_locked: true,
        };

        assert_eq!(
            fields.register_failure(&policy(), now),
            Err(LockedOut::Temporary { until })
        );
        assert_eq!(fields.failed_attempts, 5);

        fields.block();
        assert_eq!(
            fields.register_failure(&policy(), now),
            Err(LockedOut::Permanent)
        );
        assert_eq!(fields.failed_attempts, 5);
    }

    #[test]
    fn test_failure_after_expiry_starts_over() {
        let now = Utc::now();
        let mut fields = LockoutFields {
            failed_attempts: 5,
            lock_until: Some(now - Duration::seconds(1)),
            is_locked: true,
        };

        assert_eq!(
            fields.register_failure(&policy(), now),
            Ok(FailureOutcome::Counted { attempts: 1 })
        );
        assert!(!fields.is_locked);
        assert_eq!(fields.lock_until, None);
    }

    #[test]
    fn test_expire_lock() {
        let now = Utc::now();
        let mut fields = LockoutFields {
            failed_attempts: 5,
            lock_until: Some(now + Duration::minutes(1)),
            is_locked: true,
        };

        assert!(!fields.expire_lock(now));
        assert!(fields.expire_lock(now + Duration::minutes(2)));
        assert_eq!(fields, LockoutFields::default());

        let mut permanent = LockoutFields::default();
        permanent.block();
        assert!(!permanent.expire_lock(now + Duration::days(30)));
    }

    #[test]
    fn test_success_resets_temporary_but_not_permanent() {
        let now = Utc::now();
        let mut temporary = LockoutFields {
            failed_attempts: 5,
            lock_until: Some(now + Duration::minutes(15)),
            is_locked: true,
        };
        assert!(temporary.register_success());
        assert_eq!(temporary, LockoutFields::default());

        let mut permanent = LockoutFields {
            failed_attempts: 2,
            lock_until: None,
            is_locked: true,
        };
        assert!(permanent.register_success());
        assert_eq!(permanent.failed_attempts, 0);
        assert!(permanent.is_locked);

        let mut clean = LockoutFields::default();
        assert!(!clean.register_success());
    }

    #[test]
    fn test_zero_max_attempts_still_counts_one() {
        let now = Utc::now();
        let policy = LockoutPolicy::from_minutes(0, 15);
        let mut fields = LockoutFields::default();

        assert!(matches!(
            fields.register_failure(&policy, now),
            Ok(FailureOutcome::Locked { .. })
        ));
    }
}
