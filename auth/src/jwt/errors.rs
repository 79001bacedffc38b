use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

use super::claims::TokenKind;

/// Error type for token encoding, decoding and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    BadSignature,

    #[error("Token is expired")]
    Expired,

    #[error("Expected {expected} token, got {found} token")]
    WrongType { expected: TokenKind, found: TokenKind },

    #[error("Missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("Invalid claim '{claim}': {reason}")]
    InvalidClaim { claim: &'static str, reason: String },

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            // A foreign algorithm in the header is treated like a forged signature.
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}
