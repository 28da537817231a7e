//! Bearer-credential extraction from the connection handshake.
//!
//! Sources are tried in a fixed priority order and the first hit wins;
//! values from different sources are never merged:
//!
//! 1. query parameter `token`
//! 2. query parameter `access_token`
//! 3. `Authorization: Bearer <token>` header
//! 4. cookie `access`
//! 5. cookie `access_token`

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum_extra::extract::CookieJar;

/// Extracts the bearer credential from the handshake, if any.
///
/// Each source is a short-circuiting step in the chain above, so the
/// priority order stays auditable in one place.
#[must_use]
pub fn credential(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    cookies: &CookieJar,
) -> Option<String> {
    query_param(query, "token")
        .or_else(|| query_param(query, "access_token"))
        .or_else(|| bearer_header(headers))
        .or_else(|| cookie_value(cookies, "access"))
        .or_else(|| cookie_value(cookies, "access_token"))
}

/// Reads a non-empty query parameter.
fn query_param(query: &HashMap<String, String>, name: &str) -> Option<String> {
    query
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads the token portion of an `Authorization: Bearer` header.
fn bearer_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads a non-empty cookie value.
fn cookie_value(cookies: &CookieJar, name: &str) -> Option<String> {
    cookies
        .get(name)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
