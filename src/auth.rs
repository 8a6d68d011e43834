//! Password hashing and the session cookie format.
//!
//! The cookie value is base64 of `session_id:user_id`; the session row must
//! match both halves for the cookie to authenticate.

use anyhow::{anyhow, Result};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| anyhow!("generating salt: {e}"))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("hashing password: {e}"))?;
    Ok(hash.to_string())
}

/// False for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

pub fn new_session_id() -> String { uuid::Uuid::new_v4().to_string() }

pub fn encode_session_cookie(session_id: &str, user_id: i64) -> String {
    STANDARD.encode(format!("{session_id}:{user_id}"))
}

/// Inverse of `encode_session_cookie`.
pub fn decode_session_cookie(value: &str) -> Option<(String, i64)> {
    let raw = STANDARD.decode(value.trim()).ok()?;
    let raw = String::from_utf8(raw).ok()?;
    let (session_id, user_id) = raw.split_once(':')?;
    if session_id.is_empty() || user_id.contains(':') {
        return None;
    }
    Some((session_id.to_string(), user_id.parse().ok()?))
}

/// Value of cookie `name` from a `Cookie:` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}

pub fn session_set_cookie(name: &str, value: &str, secure: bool) -> String {
    let mut c = format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict");
    if secure { c.push_str("; Secure"); }
    c
}

pub fn session_clear_cookie(name: &str, secure: bool) -> String {
    let mut c = format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict");
    if secure { c.push_str("; Secure"); }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn session_cookie_decodes() {
        let v = encode_session_cookie("abc-123", 42);
        assert_eq!(decode_session_cookie(&v), Some(("abc-123".to_string(), 42)));
        assert_eq!(decode_session_cookie("!!!"), None);
        assert_eq!(decode_session_cookie(&STANDARD.encode("a:b:c")), None);
        assert_eq!(decode_session_cookie(&STANDARD.encode("nouser")), None);
    }

    #[test]
    fn finds_named_cookie() {
        let header = "theme=dark; session=abc=; other=1";
        assert_eq!(cookie_value(header, "session"), Some("abc="));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
