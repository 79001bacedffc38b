use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedPrincipal;

pub async fn session(
    principal: AuthenticatedPrincipal,
) -> Result<ApiSuccess<SessionData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, principal.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub id: i64,
    pub subject: String,
    pub authorities: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<AuthenticatedPrincipal> for SessionData {
    fn from(principal: AuthenticatedPrincipal) -> Self {
        Self {
            id: principal.id.0,
            subject: principal.subject,
            authorities: principal.authorities,
            expires_at: principal.expires_at,
        }
    }
}
