use axum::http::HeaderMap;
use axum::http::StatusCode;

use crate::inbound::http::cookies;

/// Delete both session cookies. Tokens are stateless, so nothing is revoked
/// server-side.
pub async fn logout() -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    cookies::clear_session_cookies(&mut headers);
    (StatusCode::NO_CONTENT, headers)
}
