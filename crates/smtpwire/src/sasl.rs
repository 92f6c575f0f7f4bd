//! SASL payloads for SMTP `AUTH`.
//!
//! Implements:
//! - PLAIN (RFC 4616)
//! - LOGIN (draft-murchison-sasl-login)
//! - XOAUTH2 (Google/Microsoft proprietary)

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Base64 of `Username:`, the first LOGIN challenge.
pub const LOGIN_USERNAME_CHALLENGE: &str = "VXNlcm5hbWU6";

/// Base64 of `Password:`, the second LOGIN challenge.
pub const LOGIN_PASSWORD_CHALLENGE: &str = "UGFzc3dvcmQ6";

/// Generates the PLAIN initial response.
///
/// Format: `\0<username>\0<password>` (base64 encoded). The authorization
/// identity is left empty.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let auth_string = format!("\0{username}\0{password}");
    STANDARD.encode(auth_string.as_bytes())
}

/// Encodes a single LOGIN reply (username or password).
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Generates the XOAUTH2 initial response.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01` (base64 encoded)
///
/// # Example
///
/// ```
/// use smtpwire::sasl::xoauth2_response;
///
/// assert_eq!(
///     xoauth2_response("user@host", "abcde"),
///     "dXNlcj11c2VyQGhvc3QBYXV0aD1CZWFyZXIgYWJjZGUBAQ=="
/// );
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_response() {
        assert_eq!(plain_response("abc", "def"), "AGFiYwBkZWY=");
    }

    #[test]
    fn test_plain_response_format() {
        let decoded = STANDARD.decode(plain_response("test", "pass")).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "\0test\0pass");
    }

    #[test]
    fn test_xoauth2_response() {
        assert_eq!(
            xoauth2_response("user@host", "abcde"),
            "dXNlcj11c2VyQGhvc3QBYXV0aD1CZWFyZXIgYWJjZGUBAQ=="
        );
    }

    #[test]
    fn test_login_challenges() {
        assert_eq!(login_response("Username:"), LOGIN_USERNAME_CHALLENGE);
        assert_eq!(login_response("Password:"), LOGIN_PASSWORD_CHALLENGE);
    }
}
