//! Client-credentials token exchange and memoization.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use itu_shop_core::CredentialToken;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::CatalogError;
use crate::cache::ExpiringStore;

/// A freshly issued bearer token, before the expiry margin is applied.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Bearer token value.
    pub access_token: SecretString,
    /// Lifetime in seconds as reported by the issuer.
    pub expires_in: i64,
}

/// Performs the client-credentials exchange.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Trade a client id/secret pair for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Auth`] on any failure.
    async fn issue(
        &self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<IssuedToken, CatalogError>;
}

/// Response from the OAuth token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
}

/// [`TokenIssuer`] posting a form-encoded client-credentials grant.
pub struct OAuthTokenIssuer {
    client: reqwest::Client,
    token_url: String,
}

impl OAuthTokenIssuer {
    /// Create an issuer for `token_url` with its own timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if the HTTP client cannot be built.
    pub fn new(token_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: token_url.into(),
        })
    }
}

#[async_trait]
impl TokenIssuer for OAuthTokenIssuer {
    #[instrument(skip(self, client_secret), fields(token_url = %self.token_url))]
    async fn issue(
        &self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<IssuedToken, CatalogError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CatalogError::Auth(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!(
                "Token exchange failed: HTTP {status}: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Auth(format!("Invalid token response: {e}")))?;

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CatalogError::Auth("Token response has no access_token".to_string()))?;

        Ok(IssuedToken {
            access_token: SecretString::from(access_token),
            expires_in: body.expires_in.unwrap_or(0),
        })
    }
}

/// Memoizes bearer tokens per client id in an [`ExpiringStore`].
///
/// Concurrent callers that all find the cache empty each perform an
/// exchange; the last writer wins with an equally valid token.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<CredentialCacheInner>,
}

struct CredentialCacheInner {
    issuer: Arc<dyn TokenIssuer>,
    store: Arc<dyn ExpiringStore<CredentialToken>>,
}

impl CredentialCache {
    /// Create a cache over `issuer`, storing tokens in `store`.
    #[must_use]
    pub fn new(
        issuer: Arc<dyn TokenIssuer>,
        store: Arc<dyn ExpiringStore<CredentialToken>>,
    ) -> Self {
        Self {
            inner: Arc::new(CredentialCacheInner { issuer, store }),
        }
    }

    /// A bearer token for `client_id`, issuing a new one if the cached token
    /// is missing or past its margin-adjusted expiry.
    ///
    /// Nothing is cached on failure, so the next call retries. A freshly
    /// issued token whose `expires_in` is within the margin is still returned
    /// once, though it is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Auth`] if the exchange fails.
    #[instrument(skip(self, client_secret))]
    pub async fn get_token(
        &self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<SecretString, CatalogError> {
        let key = cache_key(client_id);

        if let Some(token) = self.inner.store.get(&key).await
            && token.is_valid_at(Utc::now())
        {
            debug!("Credential cache hit");
            return Ok(SecretString::from(token.value().to_owned()));
        }

        let issued = self
            .inner
            .issuer
            .issue(client_id, client_secret)
            .await
            .inspect_err(|e| warn!(error = %e, "Credential exchange failed"))?;

        let now = Utc::now();
        let token = CredentialToken::issued(
            issued.access_token.expose_secret(),
            issued.expires_in,
            now,
        );

        let ttl = token.remaining_at(now);
        if ttl.is_zero() {
            warn!(
                expires_in = issued.expires_in,
                "Issued token expires within the safety margin; not caching"
            );
        } else {
            self.inner.store.set(&key, token, ttl).await;
            debug!(ttl_secs = ttl.as_secs(), "Cached new credential");
        }

        Ok(issued.access_token)
    }

    /// Drop the cached token for `client_id`, e.g. after the upstream
    /// rejected it.
    pub async fn invalidate(&self, client_id: &str) {
        self.inner.store.expire(&cache_key(client_id)).await;
    }
}

fn cache_key(client_id: &str) -> String {
    format!("credential:{client_id}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::MokaStore;

    struct CountingIssuer {
        calls: AtomicUsize,
        expires_in: i64,
        fail: bool,
    }

    impl CountingIssuer {
        fn new(expires_in: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                expires_in,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(3600)
            }
        }
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue(
            &self,
            _client_id: &str,
            _client_secret: &SecretString,
        ) -> Result<IssuedToken, CatalogError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(CatalogError::Auth("no access_token".to_string()));
            }
            Ok(IssuedToken {
                access_token: SecretString::from(format!("token-{n}")),
                expires_in: self.expires_in,
            })
        }
    }

    fn cache_with(issuer: &Arc<CountingIssuer>) -> CredentialCache {
        CredentialCache::new(issuer.clone(), Arc::new(MokaStore::<CredentialToken>::new(16)))
    }

    fn secret() -> SecretString {
        SecretString::from("s3cr3t")
    }

    #[tokio::test]
    async fn test_second_call_within_window_is_cached() {
        let issuer = Arc::new(CountingIssuer::new(3600));
        let cache = cache_with(&issuer);

        let first = cache.get_token("client", &secret()).await.unwrap();
        let second = cache.get_token("client", &secret()).await.unwrap();

        assert_eq!(first.expose_secret(), "token-1");
        assert_eq!(second.expose_secret(), "token-1");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        // 30s lifetime is already inside the 60s margin
        let issuer = Arc::new(CountingIssuer::new(30));
        let cache = cache_with(&issuer);

        let first = cache.get_token("client", &secret()).await.unwrap();
        let second = cache.get_token("client", &secret()).await.unwrap();

        assert_eq!(first.expose_secret(), "token-1");
        assert_eq!(second.expose_secret(), "token-2");
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let issuer = Arc::new(CountingIssuer::failing());
        let cache = cache_with(&issuer);

        assert!(matches!(
            cache.get_token("client", &secret()).await,
            Err(CatalogError::Auth(_))
        ));
        assert!(cache.get_token("client", &secret()).await.is_err());
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reissue() {
        let issuer = Arc::new(CountingIssuer::new(3600));
        let cache = cache_with(&issuer);

        cache.get_token("client", &secret()).await.unwrap();
        cache.invalidate("client").await;
        let token = cache.get_token("client", &secret()).await.unwrap();

        assert_eq!(token.expose_secret(), "token-2");
    }

    #[tokio::test]
    async fn test_tokens_are_keyed_by_client_id() {
        let issuer = Arc::new(CountingIssuer::new(3600));
        let cache = cache_with(&issuer);

        cache.get_token("a", &secret()).await.unwrap();
        cache.get_token("b", &secret()).await.unwrap();
        cache.get_token("a", &secret()).await.unwrap();

        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    }
}
