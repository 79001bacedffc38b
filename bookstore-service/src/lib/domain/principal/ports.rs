use async_trait::async_trait;
use auth::Claims;
use auth::LockoutState;
use auth::TokenPair;

use crate::domain::principal::errors::PrincipalError;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::LoginOutcome;
use crate::domain::principal::models::NewPrincipal;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::PrincipalId;
use crate::domain::principal::models::RegisterCommand;
use crate::domain::principal::models::Role;
use crate::domain::principal::models::Session;

/// Port for authentication domain service operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new customer principal.
    ///
    /// # Arguments
    /// * `command` - Validated identifier and plain text password
    ///
    /// # Returns
    /// Created principal
    ///
    /// # Errors
    /// * `AlreadyExists` - Identifier is already registered
    /// * `Password` - Password hashing failed
    /// * `DatabaseError` - Database operation failed
    async fn register(&self, command: RegisterCommand) -> Result<Principal, PrincipalError>;

    /// Run the primary login flow.
    ///
    /// A locked account is reported without checking the password. A wrong
    /// password is counted towards the lockout threshold.
    ///
    /// # Returns
    /// Login outcome; every branch except store/crypto failure is `Ok`
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    /// * `Token` - Token generation failed
    async fn login(
        &self,
        identifier: &Identifier,
        password: &str,
    ) -> Result<LoginOutcome, PrincipalError>;

    /// Record the result of a login attempt made elsewhere.
    ///
    /// # Errors
    /// * `NotFound` - No principal with this identifier
    /// * `AccountLockedTemporary` / `AccountLockedPermanent` - Failure not counted
    /// * `DatabaseError` - Database operation failed
    async fn on_login_attempt(
        &self,
        identifier: &Identifier,
        success: bool,
    ) -> Result<(), PrincipalError>;

    /// Rotate a session from a refresh token.
    ///
    /// # Returns
    /// New session, or `None` when the token is unusable, the principal is
    /// gone, or the principal is locked
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    /// * `Token` - Token generation failed
    async fn refresh(&self, refresh_token: &str) -> Result<Option<Session>, PrincipalError>;

    /// Validate an access token.
    ///
    /// # Returns
    /// Claims, or `None` for any unusable token
    fn authenticate(&self, access_token: &str) -> Option<Claims>;

    /// Mint a token pair for a principal.
    ///
    /// # Errors
    /// * `Token` - Token generation failed
    fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, PrincipalError>;

    /// Re-check a token holder against the store before a privileged action.
    ///
    /// The principal must still exist, hold `role` now and not be locked.
    /// An expired temporary lock is cleared on the way.
    ///
    /// # Returns
    /// The principal as currently stored
    ///
    /// # Errors
    /// * `Forbidden` - Principal is gone, locked or lacks the role
    /// * `DatabaseError` - Database operation failed
    async fn authorize(&self, id: PrincipalId, role: Role) -> Result<Principal, PrincipalError>;

    /// Administrative permanent lock.
    ///
    /// # Returns
    /// Lockout state after the change
    ///
    /// # Errors
    /// * `NotFound` - Principal does not exist
    /// * `DatabaseError` - Database operation failed
    async fn block(&self, id: PrincipalId) -> Result<LockoutState, PrincipalError>;

    /// Administrative unlock; clears failures as well.
    ///
    /// # Returns
    /// Lockout state after the change
    ///
    /// # Errors
    /// * `NotFound` - Principal does not exist
    /// * `DatabaseError` - Database operation failed
    async fn unblock(&self, id: PrincipalId) -> Result<LockoutState, PrincipalError>;
}

/// Persistence operations for principal aggregate.
#[async_trait]
pub trait PrincipalRepository: Send + Sync + 'static {
    /// Persist new principal to storage.
    ///
    /// # Arguments
    /// * `principal` - Fields of the principal to create
    ///
    /// # Returns
    /// Created principal with its assigned ID, open lockout state and version 0
    ///
    /// # Errors
    /// * `AlreadyExists` - Identifier is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, PrincipalError>;

    /// Retrieve principal by ID.
    ///
    /// # Returns
    /// Optional principal (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, PrincipalError>;

    /// Retrieve principal by login identifier.
    ///
    /// # Returns
    /// Optional principal (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Principal>, PrincipalError>;

    /// Save a principal if nobody else has since.
    ///
    /// Succeeds only when the stored version equals `principal.version`;
    /// the stored version is then incremented.
    ///
    /// # Returns
    /// Saved principal carrying its new version
    ///
    /// # Errors
    /// * `Conflict` - Stored version differs (concurrent update)
    /// * `NotFound` - Principal does not exist
    /// * `DatabaseError` - Database operation failed
    async fn save(&self, principal: &Principal) -> Result<Principal, PrincipalError>;
}
