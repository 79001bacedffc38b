use std::sync::Arc;

use super::claims::Claims;
use super::claims::TokenKind;
use super::codec::TokenCodec;
use super::errors::TokenError;

/// A single check run over decoded claims.
pub type ClaimCheck = fn(&Claims) -> Result<(), TokenError>;

/// The `type` claim must be present and name a known token kind.
pub fn require_known_type(claims: &Claims) -> Result<(), TokenError> {
    match claims.token_type.as_deref() {
        None => Err(TokenError::MissingClaim("type")),
        Some(raw) if TokenKind::parse(raw).is_none() => Err(TokenError::InvalidClaim {
            claim: "type",
            reason: format!("unrecognised token type '{}'", raw),
        }),
        Some(_) => Ok(()),
    }
}

/// The `sub` claim must name a principal.
pub fn require_subject(claims: &Claims) -> Result<(), TokenError> {
    if claims.sub.trim().is_empty() {
        Err(TokenError::MissingClaim("sub"))
    } else {
        Ok(())
    }
}

/// Checks applied by [`TokenValidator::new`], in order.
pub const DEFAULT_CHECKS: &[ClaimCheck] = &[require_known_type, require_subject];

/// Decodes a token and checks it is fit for a given purpose.
///
/// Validation stops at the first failure:
/// 1. decode (signature, shape, expiry)
/// 2. the `type` claim, when recognised, must match the expected kind
/// 3. each claim check, in order
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    checks: Vec<ClaimCheck>,
}

impl TokenValidator {
    /// Create a validator running [`DEFAULT_CHECKS`].
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            checks: DEFAULT_CHECKS.to_vec(),
        }
    }

    /// Append a claim check after the existing ones.
    pub fn with_check(mut self, check: ClaimCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Validate a token for use as `expected`.
    ///
    /// # Returns
    /// Decoded claims
    ///
    /// # Errors
    /// * `Malformed` / `BadSignature` / `Expired` - Decoding failed
    /// * `WrongType` - Token is of the other kind
    /// * `MissingClaim` / `InvalidClaim` - A claim check failed
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(token)?;

        if let Some(found) = claims.kind() {
            if found != expected {
                return Err(TokenError::WrongType { expected, found });
            }
        }

        self.checks.iter().try_for_each(|check| check(&claims))?;

        Ok(claims)
    }

    /// Validate a token, recovering every failure locally.
    ///
    /// Callers decide what "no claims" means (fall back to refresh, or treat
    /// the request as anonymous); the reason is only logged.
    pub fn accept(&self, token: &str, expected: TokenKind) -> Option<Claims> {
        match self.validate(token, expected) {
            Ok(claims) => Some(claims),
            Err(TokenError::Expired) => {
                tracing::debug!(kind = %expected, "Token has expired");
                None
            }
            Err(e) => {
                tracing::warn!(kind = %expected, error = %e, "Token rejected");
                None
            }
        }
    }
}
