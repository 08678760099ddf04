//! CSRF protection: double-submit token.
//!
//! `GET /api/csrf` mints a random token, sets it in a cookie, and returns it
//! in the body. Every state-changing route requires the same token echoed in
//! the `x-csrf-token` header; the comparison is constant-time.

use axum::body::Body;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::error::ApiError;
use super::models::CsrfTokenResponse;

pub const CSRF_COOKIE: &str = "vetrina_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Mint a fresh token: 32 bytes of UUID entropy through SHA-256, base64url.
pub fn mint_token() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().into_bytes());
    hasher.update(Uuid::new_v4().into_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Constant-time equality with a length guard.
pub fn tokens_match(provided: &str, expected: &str) -> bool {
    provided.len() == expected.len()
        && provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Token issuance handler.
pub async fn issue_token(jar: CookieJar) -> impl IntoResponse {
    let token = mint_token();

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    (jar.add(cookie), Json(CsrfTokenResponse { token }))
}

/// Reject state-changing requests whose header token does not match the
/// cookie. Safe methods pass through untouched.
pub async fn require_csrf(request: Request<Body>, next: Next) -> Response {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let cookie_token = jar.get(CSRF_COOKIE).map(|cookie| cookie.value().to_string());
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match (cookie_token, header_token) {
        (Some(cookie), Some(header)) if tokens_match(&header, &cookie) => {
            next.run(request).await
        }
        _ => ApiError::csrf_rejected().into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_unique_and_url_safe() {
        let a = mint_token();
        let b = mint_token();
        assert_ne!(a, b);
        assert!(!a.contains('+'));
        assert!(!a.contains('/'));
        assert!(!a.contains('='));
    }

    #[test]
    fn matching_tokens_pass() {
        let token = mint_token();
        assert!(tokens_match(&token, &token));
    }

    #[test]
    fn mismatched_tokens_fail() {
        assert!(!tokens_match(&mint_token(), &mint_token()));
        assert!(!tokens_match("short", "a-longer-token"));
        assert!(!tokens_match("", "x"));
    }
}
