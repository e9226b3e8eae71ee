//! OAuth client-credentials token with a safety margin on expiry.

use core::fmt;

use chrono::{DateTime, Duration, Utc};

/// Seconds shaved off the issuer's `expires_in` so a token is never used
/// right at its expiry.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// A bearer token obtained from a client-credentials exchange.
///
/// `expires_at` already has the safety margin applied.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CredentialToken {
    /// Build a token from the issuer's `expires_in` (seconds), issued at `now`.
    #[must_use]
    pub fn issued(value: impl Into<String>, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        let lifetime = expires_in_secs.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        Self {
            value: value.into(),
            expires_at: now + Duration::seconds(lifetime),
        }
    }

    /// The bearer token string.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the token stops being handed out.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token may still be used at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Remaining lifetime at `now`, zero once expired.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.expires_at - now).to_std().unwrap_or_default()
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_applied() {
        let now = Utc::now();
        let token = CredentialToken::issued("abc", 3600, now);
        assert_eq!(token.expires_at(), now + Duration::seconds(3540));
        assert!(token.is_valid_at(now));
        assert!(token.is_valid_at(now + Duration::seconds(3539)));
        assert!(!token.is_valid_at(now + Duration::seconds(3540)));
    }

    #[test]
    fn test_short_lived_token_is_immediately_stale() {
        let now = Utc::now();
        let token = CredentialToken::issued("abc", 30, now);
        assert!(!token.is_valid_at(now));
        assert_eq!(token.remaining_at(now), std::time::Duration::ZERO);
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = CredentialToken::issued("super-secret-bearer", 3600, Utc::now());
        let debug = format!("{token:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-bearer"));
    }
}
