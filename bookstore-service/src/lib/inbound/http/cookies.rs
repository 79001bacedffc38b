use auth::TokenPair;
use axum::http::header;
use axum::http::header::InvalidHeaderValue;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum_extra::extract::cookie::Cookie;
use chrono::Duration;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "JWT_TOKEN";

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "REFRESH_TOKEN";

/// Max-Age of the two session cookies, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    pub access_max_age: i64,
    pub refresh_max_age: i64,
}

impl CookieSettings {
    /// Cookie lifetimes match the token lifetimes, truncated to seconds.
    pub fn from_lifetimes(access: Duration, refresh: Duration) -> Self {
        Self {
            access_max_age: access.num_seconds(),
            refresh_max_age: refresh.num_seconds(),
        }
    }
}

/// Find a bearer token in the request cookies.
///
/// Every `Cookie` header is scanned in order; the first cookie with this
/// name and a non-empty value wins. Unparsable cookie pairs are skipped.
///
/// # Returns
/// Token value, or `None` if no usable cookie is present
pub fn resolve(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

fn session_cookie(name: &str, value: &str, max_age: i64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; Max-Age={}",
        name, value, max_age
    ))
}

/// Append `Set-Cookie` headers for both halves of a token pair.
pub fn set_session_cookies(
    headers: &mut HeaderMap,
    tokens: &TokenPair,
    settings: &CookieSettings,
) -> Result<(), InvalidHeaderValue> {
    headers.append(
        header::SET_COOKIE,
        session_cookie(ACCESS_COOKIE, &tokens.access.value, settings.access_max_age)?,
    );
    headers.append(
        header::SET_COOKIE,
        session_cookie(REFRESH_COOKIE, &tokens.refresh.value, settings.refresh_max_age)?,
    );
    Ok(())
}

/// Append `Set-Cookie` headers that delete both session cookies.
pub fn clear_session_cookies(headers: &mut HeaderMap) {
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        if let Ok(value) = session_cookie(name, "", 0) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}
