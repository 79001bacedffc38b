use std::sync::Arc;

use chrono::Duration;

use super::claims::Claims;
use super::claims::TokenKind;
use super::codec::SignedToken;
use super::codec::TokenCodec;
use super::errors::TokenError;

/// Identity and authorities a token pair is minted for.
///
/// Authorities are captured at issuance; later role changes only show up in
/// the next pair, so access tokens may lag by up to their lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub subject: String,
    pub principal_id: i64,
    pub authorities: Vec<String>,
}

impl Grant {
    pub fn new(subject: impl Into<String>, principal_id: i64, authorities: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            principal_id,
            authorities,
        }
    }

    fn claims(&self, kind: TokenKind) -> Claims {
        Claims::new(
            self.subject.clone(),
            self.principal_id,
            &self.authorities,
            kind,
        )
    }
}

/// Access and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: SignedToken,
    pub refresh: SignedToken,
}

/// Mints access and refresh tokens with their configured lifetimes.
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenIssuer {
    /// Create a new issuer.
    ///
    /// # Arguments
    /// * `codec` - Codec used for signing
    /// * `access_lifetime` - Lifetime of access tokens (`jwt.expiration`)
    /// * `refresh_lifetime` - Lifetime of refresh tokens (`jwt.refresh.expiration`)
    pub fn new(codec: Arc<TokenCodec>, access_lifetime: Duration, refresh_lifetime: Duration) -> Self {
        Self {
            codec,
            access_lifetime,
            refresh_lifetime,
        }
    }

    /// Issue a short-lived access token.
    pub fn issue_access(&self, grant: &Grant) -> Result<SignedToken, TokenError> {
        self.codec
            .encode(grant.claims(TokenKind::Access), self.access_lifetime)
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh(&self, grant: &Grant) -> Result<SignedToken, TokenError> {
        self.codec
            .encode(grant.claims(TokenKind::Refresh), self.refresh_lifetime)
    }

    /// Issue an access and a refresh token for the same grant.
    pub fn issue_pair(&self, grant: &Grant) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue_access(grant)?,
            refresh: self.issue_refresh(grant)?,
        })
    }
}
