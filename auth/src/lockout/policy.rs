use chrono::Duration;

/// Thresholds for brute-force lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a temporary lock
    pub max_attempts: u32,
    /// How long a temporary lock lasts
    pub lock_duration: Duration,
}

impl LockoutPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_LOCK_MINUTES: i64 = 15;
    /// Longest temporary lock accepted: one year.
    pub const MAX_LOCK_MINUTES: i64 = 365 * 24 * 60;

    /// Create a policy.
    ///
    /// A `max_attempts` of zero is raised to one so that a lock is always
    /// preceded by at least one failure. `lock_duration` is clamped to
    /// between one second and [`MAX_LOCK_MINUTES`](Self::MAX_LOCK_MINUTES),
    /// so a lock always lies in the future and never overflows.
    pub fn new(max_attempts: u32, lock_duration: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lock_duration: lock_duration
                .clamp(Duration::seconds(1), Duration::minutes(Self::MAX_LOCK_MINUTES)),
        }
    }

    /// Create a policy with the lock duration given in minutes.
    pub fn from_minutes(max_attempts: u32, lock_minutes: i64) -> Self {
        let lock_minutes = lock_minutes.clamp(1, Self::MAX_LOCK_MINUTES);
        Self::new(max_attempts, Duration::minutes(lock_minutes))
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from_minutes(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_LOCK_MINUTES)
    }
}
