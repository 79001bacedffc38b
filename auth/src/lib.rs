//! Authentication utilities library
//!
//! Provides the stateless credential engine used by the bookstore service:
//! - Password hashing (Argon2id)
//! - Signed, expiring access/refresh tokens (HS256 JWT)
//! - Token validation with pluggable claim checks
//! - The account lockout state machine
//!
//! Nothing here touches HTTP or storage; the service adapts these pieces to
//! its own ports.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Token Pairs
//! ```
//! use std::sync::Arc;
//!
//! use auth::{Authenticator, Grant, SystemClock, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = Arc::new(TokenCodec::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     Arc::new(SystemClock),
//! ));
//! let auth = Authenticator::new(codec, Duration::minutes(15), Duration::days(7));
//!
//! let grant = Grant::new("alice@example.com", 1, vec!["CUSTOMER".to_string()]);
//! let pair = auth.issue_pair(&grant).unwrap();
//!
//! assert!(auth.validate_access(&pair.access.value).is_some());
//! // A refresh token never authorizes a request.
//! assert!(auth.validate_access(&pair.refresh.value).is_none());
//! ```
//!
//! ## Lockout
//! ```
//! use auth::{LockoutFields, LockoutPolicy, LockoutState};
//! use chrono::Utc;
//!
//! let policy = LockoutPolicy::default();
//! let now = Utc::now();
//! let mut fields = LockoutFields::default();
//! for _ in 0..5 {
//!     fields.register_failure(&policy, now).unwrap();
//! }
//! assert!(matches!(fields.state(now), LockoutState::LockedTemporary { .. }));
//! ```

pub mod authenticator;
pub mod clock;
pub mod jwt;
pub mod lockout;
pub mod password;

// Re-export commonly used items
pub use authenticator::Authenticator;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use jwt::Claims;
pub use jwt::Grant;
pub use jwt::SignedToken;
pub use jwt::TokenCodec;
pub use jwt::TokenError;
pub use jwt::TokenKind;
pub use jwt::TokenPair;
pub use lockout::FailureOutcome;
pub use lockout::LockedOut;
pub use lockout::LockoutFields;
pub use lockout::LockoutPolicy;
pub use lockout::LockoutState;
pub use password::PasswordError;
pub use password::PasswordHasher;
