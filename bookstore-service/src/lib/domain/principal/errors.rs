use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;

/// Error for Identifier validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for Role parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    Unknown(String),
}

/// Top-level error for all principal-related operations
#[derive(Debug, Clone, Error)]
pub enum PrincipalError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("Invalid role: {0}")]
    InvalidRole(#[from] RoleError),

    #[error("Password error: {0}")]
    Password(#[from] auth::PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] auth::TokenError),

    // Domain-level errors
    #[error("Principal not found: {0}")]
    NotFound(String),

    #[error("Principal already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is locked until {until}")]
    AccountLockedTemporary { until: DateTime<Utc> },

    #[error("Account is locked")]
    AccountLockedPermanent,

    #[error("Insufficient privileges")]
    Forbidden,

    // Infrastructure errors
    #[error("Concurrent modification of principal {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for PrincipalError {
    fn from(err: anyhow::Error) -> Self {
        PrincipalError::Unknown(err.to_string())
    }
}
