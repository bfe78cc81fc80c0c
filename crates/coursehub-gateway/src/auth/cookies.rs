//! Token cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

fn token_cookie(
    name: &'static str,
    token: &str,
    max_age: std::time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::seconds(i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX)))
        .build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Create the access token cookie.
#[must_use]
pub fn access_cookie(token: &str, max_age: std::time::Duration, secure: bool) -> Cookie<'static> {
    token_cookie(ACCESS_TOKEN_COOKIE, token, max_age, secure)
}

/// Create the refresh token cookie.
#[must_use]
pub fn refresh_cookie(token: &str, max_age: std::time::Duration, secure: bool) -> Cookie<'static> {
    token_cookie(REFRESH_TOKEN_COOKIE, token, max_age, secure)
}

/// Replace both token cookies with expired blanks.
#[must_use]
pub fn clear_token_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE, secure))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, secure))
}

/// Read the access token from the request cookies.
#[must_use]
pub fn access_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, ACCESS_TOKEN_COOKIE)
}

/// Read the refresh token from the request cookies.
#[must_use]
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, REFRESH_TOKEN_COOKIE)
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
