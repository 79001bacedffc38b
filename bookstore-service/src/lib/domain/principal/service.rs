use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::Claims;
use auth::Clock;
use auth::FailureOutcome;
use auth::LockoutPolicy;
use auth::LockoutState;
use auth::TokenPair;

use crate::domain::principal::errors::PrincipalError;
use crate::domain::principal::lockout::LockoutTracker;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::LoginOutcome;
use crate::domain::principal::models::NewPrincipal;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::models::RegisterCommand;
use crate::domain::principal::models::Role;
use crate::domain::principal::models::Session;
use crate::domain::principal::ports::AuthServicePort;
use crate::domain::principal::ports::PrincipalRepository;

/// Domain service implementation for authentication operations.
///
/// Concrete implementation of AuthServicePort with dependency injection.
pub struct AuthService<R>
where
    R: PrincipalRepository,
{
    repository: Arc<R>,
    lockout: LockoutTracker<R>,
    authenticator: Arc<Authenticator>,
}

impl<R> AuthService<R>
where
    R: PrincipalRepository,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Principal persistence implementation
    /// * `authenticator` - Password and token engine
    /// * `policy` - Lockout thresholds
    /// * `clock` - Time source for lockout decisions; should be the
    ///   authenticator's clock
    pub fn new(
        repository: Arc<R>,
        authenticator: Arc<Authenticator>,
        policy: LockoutPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lockout: LockoutTracker::new(Arc::clone(&repository), policy, clock),
            repository,
            authenticator,
        }
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    fn session(&self, principal: Principal) -> Result<Session, PrincipalError> {
        let tokens = self.issue_pair(&principal)?;
        Ok(Session { principal, tokens })
    }

    fn locked_outcome(state: LockoutState) -> Option<LoginOutcome> {
        match state {
            LockoutState::LockedTemporary { until } => Some(LoginOutcome::LockedTemporary { until }),
            LockoutState::LockedPermanent => Some(LoginOutcome::LockedPermanent),
            LockoutState::Open | LockoutState::Warning { .. } => None,
        }
    }
}

#[async_trait]
impl<R> AuthServicePort for AuthService<R>
where
    R: PrincipalRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<Principal, PrincipalError> {
        let password_hash = self.authenticator.hash_password(&command.password)?;

        let principal = self
            .repository
            .create(NewPrincipal {
                identifier: command.identifier,
                password_hash,
                role: Role::Customer,
            })
            .await?;

        tracing::info!(
            principal_id = %principal.id,
            identifier = %principal.identifier,
            "Principal registered"
        );

        Ok(principal)
    }

    async fn login(
        &self,
        identifier: &Identifier,
        password: &str,
    ) -> Result<LoginOutcome, PrincipalError> {
        let Some(principal) = self.repository.find_by_identifier(identifier).await? else {
            self.authenticator.verify_password(password, None)?;
            tracing::info!(identifier = %identifier, "Login for unknown identifier");
            return Ok(LoginOutcome::InvalidCredentials);
        };

        let state = match self.lockout.state(identifier).await {
            Ok(state) => state,
            Err(PrincipalError::NotFound(_)) => return Ok(LoginOutcome::InvalidCredentials),
            Err(e) => return Err(e),
        };
        if let Some(outcome) = Self::locked_outcome(state) {
            tracing::info!(identifier = %identifier, "Login refused for locked account");
            return Ok(outcome);
        }

        let is_valid = self
            .authenticator
            .verify_password(password, Some(&principal.password_hash))?;

        if !is_valid {
            return match self.lockout.record_failure(identifier).await {
                Ok(FailureOutcome::Counted { attempts }) => {
                    tracing::info!(identifier = %identifier, attempts, "Login failed");
                    Ok(LoginOutcome::InvalidCredentials)
                }
                // The failure that trips the lock still reads as a bad password.
                Ok(FailureOutcome::Locked { .. }) => Ok(LoginOutcome::InvalidCredentials),
                Err(PrincipalError::AccountLockedTemporary { until }) => {
                    Ok(LoginOutcome::LockedTemporary { until })
                }
                Err(PrincipalError::AccountLockedPermanent) => Ok(LoginOutcome::LockedPermanent),
                Err(PrincipalError::NotFound(_)) => Ok(LoginOutcome::InvalidCredentials),
                Err(e) => Err(e),
            };
        }

        self.lockout.record_success(identifier).await?;
        tracing::info!(
            principal_id = %principal.id,
            identifier = %identifier,
            "Login succeeded"
        );

        Ok(LoginOutcome::Success(self.session(principal)?))
    }

    async fn on_login_attempt(
        &self,
        identifier: &Identifier,
        success: bool,
    ) -> Result<(), PrincipalError> {
        if success {
            self.lockout.record_success(identifier).await
        } else {
            self.lockout.record_failure(identifier).await.map(|_| ())
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<Session>, PrincipalError> {
        let Some(claims) = self.authenticator.validate_refresh(refresh_token) else {
            return Ok(None);
        };

        let Some(id) = claims.principal_id().map(PrincipalId) else {
            tracing::warn!(subject = %claims.sub, "Refresh token carries no principal ID");
            return Ok(None);
        };

        match self.lockout.is_locked_by_id(id).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::info!(principal_id = %id, "Refresh refused for locked account");
                return Ok(None);
            }
            Err(PrincipalError::NotFound(_)) => {
                tracing::info!(principal_id = %id, "Refresh for unknown principal");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        // Reload so the new pair carries the current role.
        let Some(principal) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };

        if principal.identifier.as_str() != claims.sub {
            tracing::warn!(
                principal_id = %id,
                subject = %claims.sub,
                "Refresh token subject does not match principal"
            );
            return Ok(None);
        }

        tracing::debug!(principal_id = %id, "Session rotated");
        self.session(principal).map(Some)
    }

    fn authenticate(&self, access_token: &str) -> Option<Claims> {
        self.authenticator.validate_access(access_token)
    }

    fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, PrincipalError> {
        Ok(self.authenticator.issue_pair(&principal.grant())?)
    }

    async fn authorize(&self, id: PrincipalId, role: Role) -> Result<Principal, PrincipalError> {
        let is_locked = match self.lockout.is_locked_by_id(id).await {
            Ok(is_locked) => is_locked,
            Err(PrincipalError::NotFound(_)) => return Err(PrincipalError::Forbidden),
            Err(e) => return Err(e),
        };

        let principal = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(PrincipalError::Forbidden)?;

        if is_locked || principal.role != role {
            tracing::warn!(principal_id = %id, required = %role, "Authorization refused");
            return Err(PrincipalError::Forbidden);
        }

        Ok(principal)
    }

    async fn block(&self, id: PrincipalId) -> Result<LockoutState, PrincipalError> {
        let state = self.lockout.block(id).await?;
        tracing::warn!(principal_id = %id, "Principal blocked");
        Ok(state)
    }

    async fn unblock(&self, id: PrincipalId) -> Result<LockoutState, PrincipalError> {
        let state = self.lockout.unblock(id).await?;
        tracing::info!(principal_id = %id, "Principal unblocked");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use auth::ManualClock;
    use auth::TokenCodec;
    use auth::TokenKind;
    use chrono::Duration;
    use mockall::mock;

    use super::*;

    mock! {
        pub TestPrincipalRepository {}

        #[async_trait]
        impl PrincipalRepository for TestPrincipalRepository {
            async fn create(&self, principal: NewPrincipal) -> Result<Principal, PrincipalError>;
            async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, PrincipalError>;
            async fn find_by_identifier(&self, identifier: &Identifier) -> Result<Option<Principal>, PrincipalError>;
            async fn save(&self, principal: &Principal) -> Result<Principal, PrincipalError>;
        }
    }

    const PASSWORD: &str = "correct horse battery staple";

    fn authenticator(clock: Arc<ManualClock>) -> Arc<Authenticator> {
        let codec = Arc::new(TokenCodec::new(b"test_secret_key_at_least_32_bytes!", clock));
        Arc::new(Authenticator::new(
            codec,
            Duration::minutes(15),
            Duration::days(7),
        ))
    }

    fn service(
        repository: MockTestPrincipalRepository,
        clock: Arc<ManualClock>,
    ) -> AuthService<MockTestPrincipalRepository> {
        AuthService::new(
            Arc::new(repository),
            authenticator(clock.clone()),
            LockoutPolicy::default(),
            clock,
        )
    }

    fn identifier() -> Identifier {
        Identifier::new("alice@example.com".to_string()).unwrap()
    }

    fn alice(password_hash: &str) -> Principal {
        Principal {
            id: PrincipalId(1),
            identifier: identifier(),
            password_hash: password_hash.to_string(),
            role: Role::Customer,
            failed_attempts: 0,
            lock_until: None,
            is_locked: false,
            version: 0,
        }
    }

    fn hash(password: &str) -> String {
        auth::PasswordHasher::new().hash(password).unwrap()
    }

    #[tokio::test]
    async fn test_register_hashes_password_and_assigns_customer_role() {
        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_create()
            .withf(|p| {
                p.identifier.as_str() == "alice@example.com"
                    && p.role == Role::Customer
                    && p.password_hash.starts_with("$argon2")
            })
            .times(1)
            .returning(|p| {
                let mut principal = alice(&p.password_hash);
                principal.identifier = p.identifier;
                Ok(principal)
            });

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let principal = service
            .register(RegisterCommand::new(identifier(), PASSWORD.to_string()))
            .await
            .unwrap();
        assert_eq!(principal.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_create()
            .times(1)
            .returning(|p| Err(PrincipalError::AlreadyExists(p.identifier.to_string())));

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let result = service
            .register(RegisterCommand::new(identifier(), PASSWORD.to_string()))
            .await;
        assert!(matches!(result, Err(PrincipalError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_login_success_issues_pair_and_resets_attempts() {
        let stored = {
            let mut principal = alice(&hash(PASSWORD));
            principal.failed_attempts = 2;
            principal
        };

        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_identifier()
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_save()
            .withf(|p| p.failed_attempts == 0)
            .times(1)
            .returning(|p| Ok(p.clone()));

        let clock = Arc::new(ManualClock::starting_now());
        let service = service(repository, clock);

        let outcome = service.login(&identifier(), PASSWORD).await.unwrap();
        let session = match outcome {
            LoginOutcome::Success(session) => session,
            other => panic!("Expected success, got {:?}", other),
        };

        assert_eq!(session.principal.id, PrincipalId(1));
        let claims = service
            .authenticator()
            .validate_token(&session.tokens.access.value, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.role, "CUSTOMER");
        assert_eq!(claims.principal_id(), Some(1));
    }

    #[tokio::test]
    async fn test_login_wrong_password_counts_failure() {
        let stored = alice(&hash(PASSWORD));

        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_identifier()
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_save()
            .withf(|p| p.failed_attempts == 1)
            .times(1)
            .returning(|p| Ok(p.clone()));

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let outcome = service.login(&identifier(), "wrong").await.unwrap();
        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_identifier_is_invalid_credentials() {
        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_identifier()
            .returning(|_| Ok(None));
        repository.expect_save().times(0);

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let outcome = service.login(&identifier(), PASSWORD).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_locked_account_skips_password_check() {
        let clock = Arc::new(ManualClock::starting_now());
        let until = clock.now() + Duration::minutes(5);
        let stored = {
            // Correct password, but locked.
            let mut principal = alice(&hash(PASSWORD));
            principal.failed_attempts = 5;
            principal.is_locked = true;
            principal.lock_until = Some(until);
            principal
        };

        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_identifier()
            .returning(move |_| Ok(Some(stored.clone())));
        repository.expect_save().times(0);

        let service = service(repository, clock);

        let outcome = service.login(&identifier(), PASSWORD).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LockedTemporary { until: u } if u == until));
    }

    #[tokio::test]
    async fn test_login_blocked_account() {
        let stored = {
            let mut principal = alice(&hash(PASSWORD));
            principal.is_locked = true;
            principal
        };

        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_identifier()
            .returning(move |_| Ok(Some(stored.clone())));

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let outcome = service.login(&identifier(), PASSWORD).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LockedPermanent));
    }

    #[tokio::test]
    async fn test_login_store_failure_is_an_error() {
        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_identifier()
            .returning(|_| Err(PrincipalError::DatabaseError("connection reset".to_string())));

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let result = service.login(&identifier(), PASSWORD).await;
        assert!(matches!(result, Err(PrincipalError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_refresh_rotates_with_current_role() {
        let clock = Arc::new(ManualClock::starting_now());
        let mut repository = MockTestPrincipalRepository::new();
        repository.expect_find_by_id().returning(|_| {
            let mut principal = alice("$argon2id$test_hash");
            principal.role = Role::Employee;
            Ok(Some(principal))
        });
        repository.expect_save().times(0);

        let service = service(repository, clock.clone());
        let old = service.issue_pair(&alice("$argon2id$test_hash")).unwrap();

        clock.advance(Duration::minutes(20));
        assert!(service.authenticate(&old.access.value).is_none());

        let session = service
            .refresh(&old.refresh.value)
            .await
            .unwrap()
            .expect("Expected rotation");
        let claims = service.authenticate(&session.tokens.access.value).unwrap();
        assert_eq!(claims.role, "EMPLOYEE");
    }

    #[tokio::test]
    async fn test_refresh_refused_for_locked_principal() {
        let mut repository = MockTestPrincipalRepository::new();
        repository.expect_find_by_id().returning(|_| {
            let mut principal = alice("$argon2id$test_hash");
            principal.is_locked = true;
            Ok(Some(principal))
        });

        let service = service(repository, Arc::new(ManualClock::starting_now()));
        let pair = service.issue_pair(&alice("$argon2id$test_hash")).unwrap();

        assert!(service.refresh(&pair.refresh.value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let mut repository = MockTestPrincipalRepository::new();
        repository.expect_find_by_id().times(0);

        let service = service(repository, Arc::new(ManualClock::starting_now()));
        let pair = service.issue_pair(&alice("$argon2id$test_hash")).unwrap();

        assert!(service.refresh(&pair.access.value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_principal() {
        let mut repository = MockTestPrincipalRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));

        let service = service(repository, Arc::new(ManualClock::starting_now()));
        let pair = service.issue_pair(&alice("$argon2id$test_hash")).unwrap();

        assert!(service.refresh(&pair.refresh.value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authorize_unknown_principal_is_forbidden() {
        let mut repository = MockTestPrincipalRepository::new();
        repository.expect_find_by_id().returning(|_| Ok(None));

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let result = service.authorize(PrincipalId(42), Role::Admin).await;
        assert!(matches!(result, Err(PrincipalError::Forbidden)));
    }

    #[tokio::test]
    async fn test_authorize_checks_stored_role() {
        let mut repository = MockTestPrincipalRepository::new();
        repository
            .expect_find_by_id()
            .returning(|_| Ok(Some(alice("$argon2id$test_hash"))));

        let service = service(repository, Arc::new(ManualClock::starting_now()));

        let result = service.authorize(PrincipalId(1), Role::Admin).await;
        assert!(matches!(result, Err(PrincipalError::Forbidden)));
        let principal = service.authorize(PrincipalId(1), Role::Customer).await.unwrap();
        assert_eq!(principal.id, PrincipalId(1));
    }

    #[tokio::test]
    async fn test_authorize_clears_expired_lock() {
        let clock = Arc::new(ManualClock::starting_now());
        let stored = {
            let mut principal = alice("$argon2id$test_hash");
            principal.role = Role::Admin;
            principal.failed_attempts = 5;
            principal.is_locked = true;
            principal.lock_until = Some(clock.now() - Duration::minutes(1));
            principal
        };

        let shared = Arc::new(Mutex::new(stored));
        let mut repository = MockTestPrincipalRepository::new();
        let reads = Arc::clone(&shared);
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(reads.lock().unwrap().clone())));
        let writes = Arc::clone(&shared);
        repository.expect_save().times(1).returning(move |p| {
            *writes.lock().unwrap() = p.clone();
            Ok(p.clone())
        });

        let service = service(repository, clock);

        let principal = service.authorize(PrincipalId(1), Role::Admin).await.unwrap();
        assert!(!principal.is_locked);
        assert_eq!(principal.lock_until, None);
    }

    #[tokio::test]
    async fn test_authorize_locked_principal_is_forbidden() {
        let clock = Arc::new(ManualClock::starting_now());
        let until = clock.now() + Duration::minutes(5);
        let mut repository = MockTestPrincipalRepository::new();
        repository.expect_find_by_id().returning(move |_| {
            let mut principal = alice("$argon2id$test_hash");
            principal.role = Role::Admin;
            principal.is_locked = true;
            principal.lock_until = Some(until);
            Ok(Some(principal))
        });

        let service = service(repository, clock);

        let result = service.authorize(PrincipalId(1), Role::Admin).await;
        assert!(matches!(result, Err(PrincipalError::Forbidden)));
    }

    /// Repository double backed by one shared principal, so consecutive
    /// calls observe each other's writes.
    fn shared_repository(stored: Principal) -> (MockTestPrincipalRepository, Arc<Mutex<Principal>>) {
        let shared = Arc::new(Mutex::new(stored));
        let mut repository = MockTestPrincipalRepository::new();

        let reads = Arc::clone(&shared);
        repository
            .expect_find_by_identifier()
            .returning(move |_| Ok(Some(reads.lock().unwrap().clone())));
        let writes = Arc::clone(&shared);
        repository.expect_save().returning(move |p| {
            let mut saved = p.clone();
            saved.version += 1;
            *writes.lock().unwrap() = saved.clone();
            Ok(saved)
        });

        (repository, shared)
    }

    #[tokio::test]
    async fn test_login_attempt_success_resets_and_clears_temporary_lock() {
        let clock = Arc::new(ManualClock::starting_now());
        let stored = {
            let mut principal = alice("$argon2id$test_hash");
            principal.failed_attempts = 5;
            principal.is_locked = true;
            principal.lock_until = Some(clock.now() + Duration::minutes(10));
            principal
        };
        let (repository, shared) = shared_repository(stored);
        let service = service(repository, clock);

        service.on_login_attempt(&identifier(), true).await.unwrap();

        let principal = shared.lock().unwrap().clone();
        assert_eq!(principal.failed_attempts, 0);
        assert!(!principal.is_locked);
        assert_eq!(principal.lock_until, None);
    }

    #[tokio::test]
    async fn test_login_attempt_failures_lock_then_refuse() {
        let clock = Arc::new(ManualClock::starting_now());
        let (repository, shared) = shared_repository(alice("$argon2id$test_hash"));
        let service = service(repository, clock.clone());

        for attempts in 1..=5 {
            service.on_login_attempt(&identifier(), false).await.unwrap();
            assert_eq!(shared.lock().unwrap().failed_attempts, attempts);
        }

        let expected_until = clock.now() + Duration::minutes(15);
        assert_eq!(shared.lock().unwrap().lock_until, Some(expected_until));

        let result = service.on_login_attempt(&identifier(), false).await;
        assert!(matches!(
            result,
            Err(PrincipalError::AccountLockedTemporary { until }) if until == expected_until
        ));
        assert_eq!(shared.lock().unwrap().failed_attempts, 5);
    }
}
