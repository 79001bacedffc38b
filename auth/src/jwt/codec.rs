use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::TokenError;
use crate::clock::Clock;

/// The only algorithm this codec signs with or accepts.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// A signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub value: String,
    pub claims: Claims,
}

/// Encodes and decodes signed, expiring claim sets.
///
/// HS256 is pinned on both sides: a token whose header names any other
/// algorithm is rejected as a bad signature, whatever its payload says.
/// Expiry is checked against the injected [`Clock`] with zero leeway.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Create a codec from raw key bytes.
    ///
    /// # Arguments
    /// * `secret` - HMAC key (should be at least 32 bytes)
    /// * `clock` - Time source for `iat`/`exp`
    pub fn new(secret: &[u8], clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            clock,
        }
    }

    /// Create a codec from a base64-encoded secret, as found in `jwt.secret`.
    ///
    /// # Errors
    /// * `InvalidSecret` - Secret is not valid base64 or is empty
    pub fn from_base64_secret(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return Err(TokenError::InvalidSecret("secret is empty".to_string()));
        }

        let encoding_key = EncodingKey::from_base64_secret(trimmed)
            .map_err(|e| TokenError::InvalidSecret(e.to_string()))?;
        let decoding_key = DecodingKey::from_base64_secret(trimmed)
            .map_err(|e| TokenError::InvalidSecret(e.to_string()))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            clock,
        })
    }

    /// Stamp `iat`/`exp` onto the claims and sign them.
    ///
    /// # Arguments
    /// * `claims` - Claims to sign; existing `iat`/`exp` are overwritten
    /// * `lifetime` - Time until the token expires
    ///
    /// # Returns
    /// Compact JWS string plus the claims as signed
    ///
    /// # Errors
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn encode(&self, mut claims: Claims, lifetime: Duration) -> Result<SignedToken, TokenError> {
        let now = self.clock.now();
        claims.iat = now.timestamp();
        claims.exp = (now + lifetime).timestamp();

        let value = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))?;

        Ok(SignedToken { value, claims })
    }

    /// Verify and decode a token.
    ///
    /// The signature is verified before any claim is looked at.
    ///
    /// # Errors
    /// * `Malformed` - Not a JWS, or the payload is not a claim set
    /// * `BadSignature` - MAC mismatch or a non-HS256 header
    /// * `Expired` - `exp` lies before the clock's current second
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is judged against our own clock below.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if claims.is_expired(self.clock.now().timestamp()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::jwt::claims::TokenKind;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";

    fn claims() -> Claims {
        Claims::new(
            "alice@example.com",
            1,
            &["CUSTOMER".to_string()],
            TokenKind::Access,
        )
    }

    #[test]
    fn test_encode_and_decode() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new(SECRET, clock.clone());

        let signed = codec
            .encode(claims(), Duration::minutes(15))
            .expect("Failed to encode token");
        assert!(!signed.value.is_empty());
        assert_eq!(signed.claims.exp - signed.claims.iat, 15 * 60);

        let decoded = codec.decode(&signed.value).expect("Failed to decode token");
        assert_eq!(decoded, signed.claims);
    }

    #[test]
    fn test_decode_until_lifetime_elapses() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new(SECRET, clock.clone());
        let signed = codec.encode(claims(), Duration::seconds(60)).unwrap();

        clock.advance(Duration::seconds(60));
        assert!(codec.decode(&signed.value).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.decode(&signed.value), Err(TokenError::Expired));
    }

    #[test]
    fn test_decode_invalid_token() {
        let codec = TokenCodec::new(SECRET, Arc::new(ManualClock::starting_now()));

        let result = codec.decode("invalid.token.here");
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec1 = TokenCodec::new(b"secret1_at_least_32_bytes_long_key!", clock.clone());
        let codec2 = TokenCodec::new(b"secret2_at_least_32_bytes_long_key!", clock);

        let signed = codec1.encode(claims(), Duration::minutes(5)).unwrap();

        assert_eq!(codec2.decode(&signed.value), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_decode_rejects_other_algorithms() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new(SECRET, clock);

        let mut foreign = claims();
        foreign.iat = Utc::now().timestamp();
        foreign.exp = foreign.iat + 600;
        let token = encode(
            &Header::new(Algorithm::HS512),
            &foreign,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_from_base64_secret() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        // base64 of "my_secret_key_at_least_32_bytes_long!"
        let encoded = "bXlfc2VjcmV0X2tleV9hdF9sZWFzdF8zMl9ieXRlc19sb25nIQ==";

        let from_base64 = TokenCodec::from_base64_secret(encoded, clock.clone()).unwrap();
        let from_raw = TokenCodec::new(SECRET, clock.clone());

        let signed = from_base64.encode(claims(), Duration::minutes(1)).unwrap();
        assert!(from_raw.decode(&signed.value).is_ok());

        assert!(matches!(
            TokenCodec::from_base64_secret("not base64!!", clock.clone()),
            Err(TokenError::InvalidSecret(_))
        ));
        assert!(matches!(
            TokenCodec::from_base64_secret("  ", clock),
            Err(TokenError::InvalidSecret(_))
        ));
    }
}
