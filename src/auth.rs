use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::http::{HeaderMap, header};
use base64ct::{Base64, Encoding};
// rand_core 0.6 is what password-hash/argon2 depends on; must match that version.
use rand_core::OsRng;
use std::time::Duration;

use crate::{rate_limit::Action, state::AppState};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "admin_session";
/// The single sentinel value established at login. The session is an
/// unsigned flag: any holder of this cookie value is indistinguishable from
/// the real admin until the cookie expires. Known, accepted weakness.
pub const SESSION_VALUE: &str = "authenticated";
/// Fixed session lifetime (8 hours), enforced solely by the cookie's own
/// Max-Age — the server keeps no session state and no revocation list.
pub const SESSION_TTL: Duration = Duration::from_secs(8 * 3600);
/// Where unauthenticated admin requests are redirected.
pub const LOGIN_PATH: &str = "/admin/login";

// ── Credential ────────────────────────────────────────────────────────────────

/// The admin password hash, sourced from configuration at startup.
/// Immutable at runtime; the cleartext password is never stored or logged.
#[derive(Clone)]
pub struct AdminCredential {
    phc: String,
}

impl AdminCredential {
    /// Decode a base64-wrapped Argon2 PHC string as supplied via
    /// `ADMIN_PASSWORD_HASH_B64`. Rejects anything that does not decode to
    /// a parseable hash, so a misconfigured value fails at startup rather
    /// than at first login.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = Base64::decode_vec(encoded.trim())
            .map_err(|e| anyhow!("Invalid base64 in password hash: {e}"))?;
        let phc = String::from_utf8(bytes).context("Password hash is not valid UTF-8")?;
        PasswordHash::new(&phc).map_err(|e| anyhow!("Invalid password hash: {e}"))?;
        Ok(Self { phc })
    }

    /// Constant-time verification via argon2. Returns `false` on any error.
    pub fn verify(&self, password: &str) -> bool {
        let parsed = match PasswordHash::new(&self.phc) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hash a password with argon2id and return the PHC string.
/// Used by the `--hash-password` utility mode.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {e}"))?
        .to_string();
    Ok(hash)
}

// ── Login ─────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Too many login attempts")]
    TooManyAttempts,
    #[error("Invalid credential")]
    InvalidCredential,
    #[error("Admin password hash is not configured")]
    ServerMisconfigured,
}

/// A successfully issued admin session. Carries no server-side state; the
/// cookie is the session.
pub struct Session;

impl Session {
    /// `Set-Cookie` value establishing the session.
    pub fn set_cookie(secure: bool) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            SESSION_COOKIE,
            SESSION_VALUE,
            SESSION_TTL.as_secs()
        );
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value deleting the session.
    pub fn clear_cookie(secure: bool) -> String {
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0", SESSION_COOKIE);
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Verify a submitted admin password and issue a session.
///
/// Rate-limit admission runs strictly first: throttled attempts never reach
/// the credential store, and they still count toward the window.
pub async fn login(state: &AppState, password: &str, identity: &str) -> Result<Session, AuthError> {
    if !state.limiter.admit(Action::Login, identity).await {
        return Err(AuthError::TooManyAttempts);
    }

    let Some(credential) = &state.credential else {
        tracing::error!("Admin login attempted but no password hash is configured");
        return Err(AuthError::ServerMisconfigured);
    };

    if credential.verify(password) {
        Ok(Session)
    } else {
        Err(AuthError::InvalidCredential)
    }
}

// ── Request-side checks ───────────────────────────────────────────────────────

/// Returns true iff the request carries the session cookie with the exact
/// sentinel value. Expiry is the cookie's own concern — an expired cookie
/// simply isn't sent.
pub fn is_authorized(headers: &HeaderMap) -> bool {
    cookie_value(headers, SESSION_COOKIE).as_deref() == Some(SESSION_VALUE)
}

/// Client identity for rate limiting: first `X-Forwarded-For` entry
/// (comma-split, trimmed), else `X-Real-IP`, else loopback. This ordering
/// determines who shares a bucket behind a proxy; keep it exact.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }

    "127.0.0.1".to_string()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_str.split(';') {
        let part = part.trim();
        if let Some(val) = part.strip_prefix(&format!("{}=", name)) {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(entries: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in entries {
            headers.append(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn client_ip_prefers_first_forwarded_entry() {
        let headers = headers_with(&[
            ("x-forwarded-for", "203.0.113.9 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_loopback() {
        let headers = headers_with(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&headers), "198.51.100.2");

        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }

    #[test]
    fn authorized_only_with_exact_sentinel() {
        let ok = headers_with(&[("cookie", "admin_session=authenticated")]);
        assert!(is_authorized(&ok));

        let wrong = headers_with(&[("cookie", "admin_session=Authenticated")]);
        assert!(!is_authorized(&wrong));

        let other = headers_with(&[("cookie", "other=authenticated")]);
        assert!(!is_authorized(&other));

        assert!(!is_authorized(&HeaderMap::new()));
    }

    #[test]
    fn cookie_value_found_among_multiple() {
        let headers = headers_with(&[("cookie", "a=1; admin_session=authenticated; b=2")]);
        assert!(is_authorized(&headers));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = Session::set_cookie(false);
        assert!(cookie.starts_with("admin_session=authenticated"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=28800"));
        assert!(!cookie.contains("Secure"));

        assert!(Session::set_cookie(true).contains("Secure"));
        assert!(Session::clear_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn credential_roundtrip() {
        let phc = hash_password("hunter2").unwrap();
        let encoded = Base64::encode_string(phc.as_bytes());

        let credential = AdminCredential::from_base64(&encoded).unwrap();
        assert!(credential.verify("hunter2"));
        assert!(!credential.verify("hunter3"));
    }

    #[test]
    fn malformed_credential_config_is_rejected() {
        // Not base64 at all.
        assert!(AdminCredential::from_base64("%%%not-base64%%%").is_err());
        // Valid base64, but not a PHC hash string.
        let garbage = Base64::encode_string(b"not a phc string");
        assert!(AdminCredential::from_base64(&garbage).is_err());
    }
}
