use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Which half of a token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived credential authorizing requests.
    Access,
    /// Long-lived credential only good for minting a new pair.
    Refresh,
}

impl TokenKind {
    /// Wire value of the `type` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    /// Parse a `type` claim value.
    ///
    /// # Returns
    /// `None` for anything other than `access` or `refresh`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access" => Some(TokenKind::Access),
            "refresh" => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set carried by every access and refresh token.
///
/// `jti` holds the principal's numeric ID and `role` the comma-joined
/// authorities granted at issuance time. `type` is kept as a raw string so
/// that an unknown value reaches the claim checks instead of failing
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Principal identifier (login e-mail)
    #[serde(default)]
    pub sub: String,

    /// Principal numeric ID, as a string
    #[serde(default)]
    pub jti: String,

    /// Comma-joined authorities
    #[serde(default)]
    pub role: String,

    /// `access` or `refresh`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,

    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

impl Claims {
    /// Create unsigned claims of the given kind.
    ///
    /// `iat` and `exp` are left at zero; the codec stamps them when encoding.
    pub fn new(
        subject: impl Into<String>,
        principal_id: i64,
        authorities: &[String],
        kind: TokenKind,
    ) -> Self {
        Self {
            sub: subject.into(),
            jti: principal_id.to_string(),
            role: authorities.join(","),
            token_type: Some(kind.as_str().to_string()),
            iat: 0,
            exp: 0,
        }
    }

    /// Token kind, if the `type` claim is present and recognised.
    pub fn kind(&self) -> Option<TokenKind> {
        self.token_type.as_deref().and_then(TokenKind::parse)
    }

    /// Principal numeric ID parsed from `jti`.
    pub fn principal_id(&self) -> Option<i64> {
        self.jti.parse().ok()
    }

    /// Authorities split out of the `role` claim.
    pub fn authorities(&self) -> Vec<&str> {
        self.role
            .split(',')
            .map(str::trim)
            .filter(|authority| !authority.is_empty())
            .collect()
    }

    /// Whether any of `roles` was granted.
    pub fn has_any_authority(&self, roles: &[&str]) -> bool {
        self.authorities()
            .iter()
            .any(|authority| roles.contains(authority))
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Check if token is expired.
    ///
    /// A token is still valid during the second named by `exp`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}
