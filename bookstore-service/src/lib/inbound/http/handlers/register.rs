use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::principal::errors::IdentifierError;
use crate::domain::principal::models::Identifier;
use crate::domain::principal::models::Principal;
use crate::domain::principal::models::RegisterCommand;
use crate::inbound::http::router::AppState;

const MIN_PASSWORD_LENGTH: usize = 6;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    state
        .auth_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref principal| ApiSuccess::new(StatusCode::CREATED, principal.into()))
}

/// HTTP request body for registering a principal (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] IdentifierError),

    #[error("Password too short: minimum {min} characters")]
    PasswordTooShort { min: usize },
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let identifier = Identifier::new(self.email)?;
        if self.password.trim().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ParseRegisterRequestError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        Ok(RegisterCommand::new(identifier, self.password))
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl From<&Principal> for RegisterResponseData {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.0,
            email: principal.identifier.as_str().to_string(),
            role: principal.role.as_str().to_string(),
        }
    }
}
