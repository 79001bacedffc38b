use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::jwt::Claims;
use crate::jwt::Grant;
use crate::jwt::TokenCodec;
use crate::jwt::TokenError;
use crate::jwt::TokenIssuer;
use crate::jwt::TokenKind;
use crate::jwt::TokenPair;
use crate::jwt::TokenValidator;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Authentication coordinator combining password verification, token
/// issuance and token validation.
///
/// One instance is shared by all requests; nothing in it is mutable.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl Authenticator {
    /// Create a new authenticator over an existing codec.
    ///
    /// # Arguments
    /// * `codec` - Token codec (carries the signing key and clock)
    /// * `access_lifetime` - Access token lifetime
    /// * `refresh_lifetime` - Refresh token lifetime
    pub fn new(codec: Arc<TokenCodec>, access_lifetime: Duration, refresh_lifetime: Duration) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            issuer: TokenIssuer::new(codec.clone(), access_lifetime, refresh_lifetime),
            validator: TokenValidator::new(codec),
        }
    }

    /// Create an authenticator from a base64 signing secret.
    ///
    /// # Errors
    /// * `InvalidSecret` - Secret is empty or not base64
    pub fn from_base64_secret(
        secret: &str,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        let codec = Arc::new(TokenCodec::from_base64_secret(secret, clock)?);
        Ok(Self::new(codec, access_lifetime, refresh_lifetime))
    }

    /// Hash a password for storage.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify a password against a stored hash.
    ///
    /// Pass `None` as `stored_hash` when no principal matched; the same
    /// amount of hashing work is done and `false` is returned.
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash: Option<&str>,
    ) -> Result<bool, PasswordError> {
        match stored_hash {
            Some(hash) => self.password_hasher.verify(password, hash),
            None => Ok(self.password_hasher.verify_decoy(password)),
        }
    }

    /// Mint a token pair without password verification (login already
    /// happened, or a refresh token was accepted).
    pub fn issue_pair(&self, grant: &Grant) -> Result<TokenPair, TokenError> {
        self.issuer.issue_pair(grant)
    }

    /// Claims of a usable access token, or `None`.
    pub fn validate_access(&self, token: &str) -> Option<Claims> {
        self.validator.accept(token, TokenKind::Access)
    }

    /// Claims of a usable refresh token, or `None`.
    pub fn validate_refresh(&self, token: &str) -> Option<Claims> {
        self.validator.accept(token, TokenKind::Refresh)
    }

    /// Validate with the full error, for callers that need the reason.
    pub fn validate_token(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.validator.validate(token, expected)
    }
}
