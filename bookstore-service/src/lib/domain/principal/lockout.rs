use std::fmt;
use std::sync::Arc;

use auth::Clock;
use auth::FailureOutcome;
use auth::LockedOut;
use auth::LockoutFields;
use auth::LockoutPolicy;
use auth::LockoutState;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::principal::errors::PrincipalError;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::ports::PrincipalRepository;

/// Attempts at a compare-and-swap save before giving up.
const MAX_SAVE_ATTEMPTS: usize = 5;

/// How a lockout operation finds its principal.
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Identifier(&'a Identifier),
    Id(PrincipalId),
}

impl fmt::Display for Lookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Identifier(identifier) => identifier.fmt(f),
            Lookup::Id(id) => id.fmt(f),
        }
    }
}

/// Store-backed lockout operations.
///
/// Each operation loads the principal, applies a pure transition from
/// [`auth::lockout`] and saves with compare-and-swap on `version`. A stale
/// version reloads and reapplies, so a concurrent failure is never lost and
/// nothing is written unless the whole transition lands.
pub struct LockoutTracker<R>
where
    R: PrincipalRepository,
{
    repository: Arc<R>,
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> LockoutTracker<R>
where
    R: PrincipalRepository,
{
    pub fn new(repository: Arc<R>, policy: LockoutPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Count a failed login.
    ///
    /// # Returns
    /// Whether the failure was merely counted or tripped the lock
    ///
    /// # Errors
    /// * `AccountLockedTemporary` - Unexpired temporary lock, nothing counted
    /// * `AccountLockedPermanent` - Administrative lock, nothing counted
    /// * `NotFound` - No principal with this identifier
    /// * `DatabaseError` - Database operation failed or kept conflicting
    pub async fn record_failure(
        &self,
        identifier: &Identifier,
    ) -> Result<FailureOutcome, PrincipalError> {
        let policy = self.policy;
        let outcome = self
            .transition(Lookup::Identifier(identifier), move |fields, now| {
                let outcome = fields.register_failure(&policy, now);
                let changed = outcome.is_ok();
                (outcome, changed)
            })
            .await?;

        match outcome {
            Ok(FailureOutcome::Locked { until }) => {
                tracing::warn!(
                    identifier = %identifier,
                    until = %until,
                    "Account locked after repeated login failures"
                );
                Ok(FailureOutcome::Locked { until })
            }
            Ok(counted) => Ok(counted),
            Err(LockedOut::Temporary { until }) => {
                Err(PrincipalError::AccountLockedTemporary { until })
            }
            Err(LockedOut::Permanent) => Err(PrincipalError::AccountLockedPermanent),
        }
    }

    /// Record a successful login: reset failures and lift a temporary lock.
    ///
    /// # Errors
    /// * `NotFound` - No principal with this identifier
    /// * `DatabaseError` - Database operation failed or kept conflicting
    pub async fn record_success(&self, identifier: &Identifier) -> Result<(), PrincipalError> {
        self.transition(Lookup::Identifier(identifier), |fields, _| {
            ((), fields.register_success())
        })
        .await
    }

    /// Current lockout state, persisting the reset of an expired lock.
    ///
    /// # Errors
    /// * `NotFound` - No principal with this identifier
    /// * `DatabaseError` - Database operation failed or kept conflicting
    pub async fn state(&self, identifier: &Identifier) -> Result<LockoutState, PrincipalError> {
        self.observe(Lookup::Identifier(identifier)).await
    }

    /// Whether the principal is locked now. An expired lock is cleared and
    /// reported as unlocked.
    ///
    /// # Errors
    /// * `NotFound` - No principal with this identifier
    /// * `DatabaseError` - Database operation failed or kept conflicting
    pub async fn is_locked(&self, identifier: &Identifier) -> Result<bool, PrincipalError> {
        Ok(self.state(identifier).await?.is_locked())
    }

    /// [`is_locked`](Self::is_locked) by principal ID.
    pub async fn is_locked_by_id(&self, id: PrincipalId) -> Result<bool, PrincipalError> {
        Ok(self.observe(Lookup::Id(id)).await?.is_locked())
    }

    /// Administrative permanent lock.
    pub async fn block(&self, id: PrincipalId) -> Result<LockoutState, PrincipalError> {
        self.transition(Lookup::Id(id), |fields, now| {
            let before = *fields;
            fields.block();
            (fields.state(now), *fields != before)
        })
        .await
    }

    /// Administrative unlock, forgetting past failures.
    pub async fn unblock(&self, id: PrincipalId) -> Result<LockoutState, PrincipalError> {
        self.transition(Lookup::Id(id), |fields, now| {
            let before = *fields;
            fields.unblock();
            (fields.state(now), *fields != before)
        })
        .await
    }

    async fn observe(&self, lookup: Lookup<'_>) -> Result<LockoutState, PrincipalError> {
        self.transition(lookup, |fields, now| {
            let changed = fields.expire_lock(now);
            (fields.state(now), changed)
        })
        .await
    }

    async fn load(&self, lookup: Lookup<'_>) -> Result<Principal, PrincipalError> {
        let principal = match lookup {
            Lookup::Identifier(identifier) => self.repository.find_by_identifier(identifier).await?,
            Lookup::Id(id) => self.repository.find_by_id(id).await?,
        };
        principal.ok_or_else(|| PrincipalError::NotFound(lookup.to_string()))
    }

    /// Load, apply `apply` to the lockout fields and save if it reports a
    /// change, retrying on version conflicts.
    async fn transition<T, F>(&self, lookup: Lookup<'_>, apply: F) -> Result<T, PrincipalError>
    where
        T: Send,
        F: Fn(&mut LockoutFields, DateTime<Utc>) -> (T, bool) + Send + Sync,
    {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut principal = self.load(lookup).await?;
            let now = self.clock.now();

            let mut fields = principal.lockout_fields();
            let (result, changed) = apply(&mut fields, now);
            if !changed {
                return Ok(result);
            }

            principal.set_lockout_fields(fields);
            match self.repository.save(&principal).await {
                Ok(_) => return Ok(result),
                Err(PrincipalError::Conflict(_)) => {
                    tracing::debug!(
                        principal = %lookup,
                        attempt,
                        "Concurrent lockout update, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::error!(
            principal = %lookup,
            attempts = MAX_SAVE_ATTEMPTS,
            "Lockout update kept conflicting"
        );
        Err(PrincipalError::DatabaseError(format!(
            "lockout update for {} conflicted {} times",
            lookup, MAX_SAVE_ATTEMPTS
        )))
    }
}
