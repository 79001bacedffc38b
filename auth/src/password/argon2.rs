use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;

use super::errors::PasswordError;

/// Password hashing implementation.
///
/// Argon2id with a random salt per hash, stored as PHC strings.
pub struct PasswordHasher {
    /// Hash verified against when no principal matched the identifier.
    decoy_hash: String,
}

impl PasswordHasher {
    /// Create a new password hasher instance.
    pub fn new() -> Self {
        // Falls back to an unparsable decoy only if the OS RNG is unavailable,
        // in which case real hashing fails too.
        let decoy_hash = Self::hash_with_defaults("decoy-password-for-unknown-principals")
            .unwrap_or_default();
        Self { decoy_hash }
    }

    fn hash_with_defaults(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Hash a plaintext password.
    ///
    /// # Returns
    /// PHC string (algorithm, parameters, salt and hash)
    ///
    /// # Errors
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Self::hash_with_defaults(password)
    }

    /// Verify a password against a stored hash.
    ///
    /// # Returns
    /// True if password matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is not a valid PHC string
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            PasswordError::VerificationFailed(format!("Invalid password hash: {}", e))
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Burn the same work as [`verify`](Self::verify) for an unknown principal.
    ///
    /// Always returns `false`, so a missing account and a wrong password take
    /// comparable time and give the same answer.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.decoy_hash);
        false
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
