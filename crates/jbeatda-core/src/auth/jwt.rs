//! Read-only inspection of backend-issued JWTs.
//!
//! The backend signs its access tokens; the client never verifies them, it
//! only peeks at the `exp` claim so the session can track expiry without the
//! login response having to carry it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Characters of a token kept in log output
const FINGERPRINT_LEN: usize = 8;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Expiry encoded in the token's `exp` claim, if it is a readable JWT.
pub fn expiry_from_token(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.trim().split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

/// Short, log-safe stand-in for a token.
pub fn fingerprint(token: &str) -> String {
    let prefix: String = token.chars().take(FINGERPRINT_LEN).collect();
    if prefix.len() < token.len() {
        format!("{}...", prefix)
    } else {
        "REDACTED".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_expiry_from_token_reads_exp_claim() {
        let token = token_with_payload(r#"{"email":"a@b.c","userId":"7","exp":1700000000}"#);
        let expiry = expiry_from_token(&token).unwrap();
        assert_eq!(expiry.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_expiry_from_token_without_exp() {
        let token = token_with_payload(r#"{"email":"a@b.c"}"#);
        assert_eq!(expiry_from_token(&token), None);
    }

    #[test]
    fn test_expiry_from_opaque_tokens() {
        assert_eq!(expiry_from_token("abc123"), None);
        assert_eq!(expiry_from_token("a.b"), None);
        assert_eq!(expiry_from_token("a.b.c.d"), None);
        assert_eq!(expiry_from_token("a.!!!.c"), None);
    }

    #[test]
    fn test_fingerprint_hides_short_tokens() {
        assert_eq!(fingerprint("abc123"), "REDACTED");
        assert_eq!(fingerprint("eyJhbGciOiJIUzI1NiJ9.x.y"), "eyJhbGci...");
    }
}
