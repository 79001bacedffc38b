use auth::Claims;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::request::Parts;
use axum::http::Extensions;
use axum::middleware::Next;
use axum::response::Response;
use chrono::DateTime;
use chrono::Utc;

use super::cookies;
use super::cookies::ACCESS_COOKIE;
use super::cookies::REFRESH_COOKIE;
use super::handlers::ApiError;
use crate::domain::principal::models::PrincipalId;
use crate::inbound::http::router::AppState;

/// Paths served without looking at any credential.
const PUBLIC_PREFIXES: &[&str] = &[
    "/css/",
    "/js/",
    "/images/",
    "/img/",
    "/books",
    "/categories",
    "/cart/",
];

const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login",
    "/register",
    "/favicon.ico",
    "/error",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/api/auth/logout",
];

/// Roles allowed on administrative routes.
pub const ADMIN_ROLES: &[&str] = &["ADMIN"];

/// Extension type carrying the authenticated principal of a request.
///
/// Built from validated access-token claims. Authorities reflect the
/// principal's role at issuance time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub id: PrincipalId,
    pub subject: String,
    pub authorities: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthenticatedPrincipal {
    /// Returns `None` if the claims carry no usable principal ID.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Self {
            id: PrincipalId(claims.principal_id()?),
            subject: claims.sub.clone(),
            authorities: claims
                .authorities()
                .into_iter()
                .map(str::to_string)
                .collect(),
            expires_at: claims.expires_at(),
        })
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.authorities
            .iter()
            .any(|authority| roles.contains(&authority.as_str()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        is_request_authenticated(&parts.extensions)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// The authenticated principal of a request, if any.
pub fn is_request_authenticated(extensions: &Extensions) -> Option<AuthenticatedPrincipal> {
    extensions.get::<AuthenticatedPrincipal>().cloned()
}

/// Whether a path bypasses credential inspection.
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
        || PUBLIC_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

/// Middleware that authenticates requests from session cookies, silently
/// rotating the token pair when only the refresh token is still good.
///
/// Never rejects a request by itself: anything short of a valid credential
/// proceeds anonymous and route guards decide. Only a store failure during
/// rotation fails the request.
pub async fn refresh_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let authenticated = cookies::resolve(req.headers(), ACCESS_COOKIE)
        .and_then(|token| state.auth_service.authenticate(&token))
        .and_then(|claims| AuthenticatedPrincipal::from_claims(&claims));

    if let Some(principal) = authenticated {
        req.extensions_mut().insert(principal);
        return Ok(next.run(req).await);
    }

    let Some(refresh_token) = cookies::resolve(req.headers(), REFRESH_COOKIE) else {
        return Ok(next.run(req).await);
    };

    let Some(session) = state.auth_service.refresh(&refresh_token).await? else {
        return Ok(next.run(req).await);
    };

    let Some(principal) = AuthenticatedPrincipal::from_claims(&session.tokens.access.claims) else {
        return Ok(next.run(req).await);
    };

    tracing::debug!(
        principal_id = %principal.id,
        path = %req.uri().path(),
        "Access token refreshed in flight"
    );

    req.extensions_mut().insert(principal);
    let mut response = next.run(req).await;
    cookies::set_session_cookies(response.headers_mut(), &session.tokens, &state.cookies)?;

    Ok(response)
}

/// Route layer rejecting anonymous requests with 401.
pub async fn require_authenticated(req: Request, next: Next) -> Result<Response, ApiError> {
    if is_request_authenticated(req.extensions()).is_none() {
        return Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        ));
    }
    Ok(next.run(req).await)
}

/// Route layer requiring one of `roles`: 401 when anonymous, 403 when the
/// principal holds none of them.
///
/// Use with `middleware::from_fn_with_state(ROLES, require_role)`.
pub async fn require_role(
    State(roles): State<&'static [&'static str]>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = is_request_authenticated(req.extensions())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if !principal.has_any_role(roles) {
        tracing::warn!(
            principal_id = %principal.id,
            path = %req.uri().path(),
            "Access denied"
        );
        return Err(ApiError::Forbidden("Insufficient privileges".to_string()));
    }

    Ok(next.run(req).await)
}
