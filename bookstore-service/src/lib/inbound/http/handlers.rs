use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::principal::errors::PrincipalError;

pub mod admin;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod register;
pub mod session;

/// Message for any failed login, whatever the reason.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Message for a locked account; deliberately without the unlock time.
pub const ACCOUNT_LOCKED_MESSAGE: &str = "Account is temporarily locked. Try again later.";

/// Message when a refresh token cannot be used.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    Locked(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl From<InvalidHeaderValue> for ApiError {
    fn from(e: InvalidHeaderValue) -> Self {
        Self::InternalServerError(format!("Failed to build cookie header: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Locked(msg) => (StatusCode::LOCKED, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<PrincipalError> for ApiError {
    fn from(err: PrincipalError) -> Self {
        match err {
            PrincipalError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PrincipalError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            PrincipalError::InvalidCredentials => {
                ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string())
            }
            PrincipalError::AccountLockedTemporary { .. } | PrincipalError::AccountLockedPermanent => {
                ApiError::Locked(ACCOUNT_LOCKED_MESSAGE.to_string())
            }
            PrincipalError::Forbidden => ApiError::Forbidden(err.to_string()),
            PrincipalError::InvalidIdentifier(_) | PrincipalError::InvalidRole(_) => {
                ApiError::UnprocessableEntity(err.to_string())
            }
            PrincipalError::Password(_)
            | PrincipalError::Token(_)
            | PrincipalError::Conflict(_)
            | PrincipalError::DatabaseError(_)
            | PrincipalError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_lock_errors_hide_unlock_time() {
        let error = ApiError::from(PrincipalError::AccountLockedTemporary { until: Utc::now() });
        assert_eq!(error, ApiError::Locked(ACCOUNT_LOCKED_MESSAGE.to_string()));
        assert_eq!(
            ApiError::from(PrincipalError::AccountLockedPermanent),
            ApiError::Locked(ACCOUNT_LOCKED_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_store_errors_are_internal() {
        let error = ApiError::from(PrincipalError::DatabaseError("boom".to_string()));
        assert!(matches!(error, ApiError::InternalServerError(_)));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
