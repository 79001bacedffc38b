use std::fmt;
use std::str::FromStr;

use auth::Grant;
use auth::LockoutFields;
use auth::TokenPair;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::principal::errors::IdentifierError;
use crate::domain::principal::errors::RoleError;

/// Principal aggregate entity.
///
/// An account that can log in. Lockout columns are kept flat, as stored,
/// and read through [`Principal::lockout_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub identifier: Identifier,
    pub password_hash: String,
    pub role: Role,
    pub failed_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub is_locked: bool,
    /// Bumped on every successful save; used for compare-and-swap
    pub version: i64,
}

impl Principal {
    pub fn lockout_fields(&self) -> LockoutFields {
        LockoutFields {
            failed_attempts: self.failed_attempts,
            lock_until: self.lock_until,
            is_locked: self.is_locked,
        }
    }

    pub fn set_lockout_fields(&mut self, fields: LockoutFields) {
        self.failed_attempts = fields.failed_attempts;
        self.lock_until = fields.lock_until;
        self.is_locked = fields.is_locked;
    }

    /// Authorities granted to this principal.
    pub fn authorities(&self) -> Vec<String> {
        vec![self.role.as_str().to_string()]
    }

    /// Token grant carrying the principal's current authorities.
    pub fn grant(&self) -> Grant {
        Grant::new(self.identifier.as_str(), self.id.0, self.authorities())
    }
}

/// Principal unique identifier type (store-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Login identifier (e-mail address)
///
/// Validates format using RFC 5322 compliant parser. Stored lowercased so
/// lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Create a new validated identifier.
    ///
    /// # Arguments
    /// * `identifier` - Raw e-mail string
    ///
    /// # Returns
    /// Validated, lowercased Identifier
    ///
    /// # Errors
    /// * `InvalidFormat` - Not a valid e-mail address
    pub fn new(identifier: String) -> Result<Self, IdentifierError> {
        let normalized = identifier.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| Identifier(normalized))
            .map_err(|e| IdentifierError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Granted role; rendered as the authority string in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    Employee,
    Admin,
}

impl Role {
    pub const CUSTOMER: &'static str = "CUSTOMER";
    pub const EMPLOYEE: &'static str = "EMPLOYEE";
    pub const ADMIN: &'static str = "ADMIN";

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => Self::CUSTOMER,
            Role::Employee => Self::EMPLOYEE,
            Role::Admin => Self::ADMIN,
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::CUSTOMER => Ok(Role::Customer),
            Self::EMPLOYEE => Ok(Role::Employee),
            Self::ADMIN => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal fields supplied at creation; the store assigns the ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub identifier: Identifier,
    pub password_hash: String,
    pub role: Role,
}

/// Command to register a new principal with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub identifier: Identifier,
    pub password: String,
}

impl RegisterCommand {
    /// Construct a new register command.
    ///
    /// # Arguments
    /// * `identifier` - Validated login identifier
    /// * `password` - Plain text password (will be hashed by service)
    pub fn new(identifier: Identifier, password: String) -> Self {
        Self {
            identifier,
            password,
        }
    }
}

/// A principal together with a freshly minted token pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub tokens: TokenPair,
}

/// Result of a primary login attempt.
///
/// Every branch is an expected outcome; only store and crypto failures are
/// errors.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(Session),
    /// Unknown identifier or wrong password; the two are not distinguished
    InvalidCredentials,
    LockedTemporary { until: DateTime<Utc> },
    LockedPermanent,
}
