use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;

use super::login::SessionResponseData;
use super::ApiError;
use super::ApiSuccess;
use super::SESSION_EXPIRED_MESSAGE;
use crate::inbound::http::cookies;
use crate::inbound::http::cookies::REFRESH_COOKIE;
use crate::inbound::http::router::AppState;

/// Explicit rotation: trade the `REFRESH_TOKEN` cookie for a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, ApiSuccess<SessionResponseData>), ApiError> {
    let session_expired = || ApiError::Unauthorized(SESSION_EXPIRED_MESSAGE.to_string());

    let token = cookies::resolve(&headers, REFRESH_COOKIE).ok_or_else(session_expired)?;
    let session = state
        .auth_service
        .refresh(&token)
        .await?
        .ok_or_else(session_expired)?;

    let mut response_headers = HeaderMap::new();
    cookies::set_session_cookies(&mut response_headers, &session.tokens, &state.cookies)?;

    Ok((
        response_headers,
        ApiSuccess::new(StatusCode::OK, (&session).into()),
    ))
}
