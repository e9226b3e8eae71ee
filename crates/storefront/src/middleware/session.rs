//! Session middleware configuration and shopper identity.
//!
//! Sessions live in the in-process memory store; carts are scoped to a
//! session and are not meant to outlive it.

use axum::{extract::FromRequestParts, http::request::Parts};
use itu_shop_core::SessionId;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::models::{CsrfToken, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "itu_session";

/// Session expiry time in seconds (7 days).
pub const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with the in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// The caller's session plus the shopper id that keys their cart.
///
/// The id is created and stored on first use.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(shopper: ShopperSession) -> impl IntoResponse {
///     let cart = state.carts().get(shopper.id()).await;
///     // ...
/// }
/// ```
pub struct ShopperSession {
    session: Session,
    id: SessionId,
}

impl ShopperSession {
    /// Shopper id for this session.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The anti-forgery token for this session, created if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the session store fails.
    pub async fn csrf_token(&self) -> Result<CsrfToken, AppError> {
        if let Some(token) = self
            .session
            .get::<CsrfToken>(session_keys::CSRF_TOKEN)
            .await?
        {
            return Ok(token);
        }

        let token = CsrfToken::generate();
        self.session
            .insert(session_keys::CSRF_TOKEN, token.clone())
            .await?;
        Ok(token)
    }
}

impl<S> FromRequestParts<S> for ShopperSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))?;

        let id = match session.get::<SessionId>(session_keys::SESSION_ID).await? {
            Some(id) => id,
            None => {
                let id = SessionId::generate();
                session.insert(session_keys::SESSION_ID, id).await?;
                tracing::debug!(session = %id, "Started shopper session");
                id
            }
        };

        Ok(Self { session, id })
    }
}
