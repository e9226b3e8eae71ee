//! Anti-forgery check for state-changing requests.
//!
//! The browser fetches its token from `GET /api/session` and echoes it in the
//! `X-CSRF-Token` header. Handlers that take [`CsrfProtected`] reject the
//! request with 403 before any body parsing or store access.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CsrfToken, session_keys};

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Marker extractor: present only when the request carried a valid token.
#[derive(Debug, Clone, Copy)]
pub struct CsrfProtected;

impl<S> FromRequestParts<S> for CsrfProtected
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Forbidden("Missing anti-forgery token".to_string()))?;

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))?;

        let expected = session
            .get::<CsrfToken>(session_keys::CSRF_TOKEN)
            .await?
            .ok_or_else(|| AppError::Forbidden("No anti-forgery token issued".to_string()))?;

        if !expected.matches(presented) {
            tracing::warn!(path = %parts.uri.path(), "Anti-forgery token mismatch");
            return Err(AppError::Forbidden(
                "Invalid anti-forgery token".to_string(),
            ));
        }

        Ok(Self)
    }
}
