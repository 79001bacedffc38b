use thiserror::Error;

/// Error type for password hashing and verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Stored password hash is unusable: {0}")]
    VerificationFailed(String),
}
