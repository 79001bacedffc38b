use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use super::ACCOUNT_LOCKED_MESSAGE;
use super::INVALID_CREDENTIALS_MESSAGE;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::LoginOutcome;
use crate::domain::principal::models::Session;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestBody>,
) -> Result<(HeaderMap, ApiSuccess<SessionResponseData>), ApiError> {
    // A malformed identifier cannot match any principal.
    let identifier = Identifier::new(body.username)
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))?;

    match state
        .auth_service
        .login(&identifier, &body.password)
        .await?
    {
        LoginOutcome::Success(session) => {
            let mut headers = HeaderMap::new();
            cookies::set_session_cookies(&mut headers, &session.tokens, &state.cookies)?;
            Ok((headers, ApiSuccess::new(StatusCode::OK, (&session).into())))
        }
        LoginOutcome::InvalidCredentials => Err(ApiError::Unauthorized(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        )),
        LoginOutcome::LockedTemporary { .. } | LoginOutcome::LockedPermanent => {
            Err(ApiError::Locked(ACCOUNT_LOCKED_MESSAGE.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    #[serde(alias = "email")]
    username: String,
    password: String,
}

/// Principal and access-token expiry of a freshly issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResponseData {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub access_expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionResponseData {
    fn from(session: &Session) -> Self {
        Self {
            id: session.principal.id.0,
            email: session.principal.identifier.as_str().to_string(),
            role: session.principal.role.as_str().to_string(),
            access_expires_at: session.tokens.access.claims.expires_at(),
        }
    }
}
