//! Session-related types.
//!
//! Types stored in the session to identify the shopper and protect cart
//! mutations from cross-site forgery.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Session keys for shopper state.
pub mod session_keys {
    /// Key for the [`SessionId`](itu_shop_core::SessionId) that owns the cart.
    pub const SESSION_ID: &str = "itu.session_id";
    /// Key for the anti-forgery [`CsrfToken`](super::CsrfToken).
    pub const CSRF_TOKEN: &str = "itu.csrf_token";
}

/// Per-session anti-forgery token (128-bit, base64-encoded).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// The token value sent to the browser.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Compare against a presented token without short-circuiting on the
    /// first differing byte.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random_and_sized() {
        let a = CsrfToken::generate();
        let b = CsrfToken::generate();
        assert_ne!(a, b);
        // 16 bytes base64-encoded with padding
        assert_eq!(a.value().len(), 24);
    }

    #[test]
    fn test_matches() {
        let token = CsrfToken::generate();
        let value = token.value().to_string();
        assert!(token.matches(&value));
        assert!(!token.matches(""));
        assert!(!token.matches(&value[..value.len() - 1]));

        let mut tampered = value.into_bytes();
        tampered[0] = if tampered[0] == b'A' { b'B' } else { b'A' };
        assert!(!token.matches(&String::from_utf8(tampered).unwrap_or_default()));
    }

    #[test]
    fn test_debug_redacts() {
        let token = CsrfToken::generate();
        assert!(!format!("{token:?}").contains(token.value()));
    }
}
