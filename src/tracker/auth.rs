//! Password hashing, session cookies and the `CurrentUser` extractor.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use chrono::Duration;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::api::{ApiError, SharedState, found};
use super::models::User;

pub const SESSION_COOKIE: &str = "tracker_session";

/// Sessions and their cookies last two weeks from sign-in.
pub const SESSION_TTL_DAYS: i64 = 14;

pub fn session_ttl() -> Duration {
    Duration::days(SESSION_TTL_DAYS)
}

const HASH_SCHEME: &str = "sha256";

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a password as `sha256$<salt>$<hex digest>` with a fresh salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest_hex(&salt, password);
    format!("{}${}${}", HASH_SCHEME, salt, digest)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(HASH_SCHEME), Some(salt), Some(expected)) => {
            let actual = digest_hex(salt, password);
            actual.len() == expected.len()
                && actual
                    .bytes()
                    .zip(expected.bytes())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
        }
        _ => false,
    }
}

pub fn new_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE,
        token,
        session_ttl().num_seconds()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", SESSION_COOKIE)
}

/// Pull the session token out of the `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn encode_next(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

pub fn login_redirect(next: &str) -> Response {
    found(&format!("/accounts/login/?next={}", encode_next(next)))
}

/// Only same-site absolute paths are honoured as post-login targets.
///
/// Browsers read `/\host` like `//host`, so backslashes are refused along
/// with control characters.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(n)
            if n.starts_with('/')
                && !n.starts_with("//")
                && !n.contains('\\')
                && !n.chars().any(char::is_control) =>
        {
            n.to_string()
        }
        _ => "/".to_string(),
    }
}

/// The signed-in user. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let Some(token) = session_token(&parts.headers) else {
            return Err(login_redirect(&path));
        };
        let user = state
            .db
            .call(move |db| db.user_for_session(&token))
            .await
            .map_err(|e| ApiError::from(e).into_response())?;
        match user {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                tracing::debug!(path = %path, "stale session cookie, redirecting to login");
                Err(login_redirect(&path))
            }
        }
    }
}
