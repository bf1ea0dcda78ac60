//! Credential extraction from request headers.

use axum::http::{HeaderMap, header};

/// Header carrying the renewal credential, on requests and on renewed responses.
pub const REFRESH_HEADER_NAME: &str = "refresh";

/// Cookie name for the renewal credential (alternative to the header).
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

const BEARER_PREFIX: &str = "Bearer";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract the access token from an `Authorization: Bearer <token>` header.
///
/// Returns None when the header is absent or is not a bearer credential; such
/// requests are not the gate's concern. A bearer header with an empty or
/// garbled token still returns Some so it can be rejected as malformed.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?;
    Some(token.trim())
}
