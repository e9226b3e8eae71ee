//! Session bootstrap handler.

use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::middleware::ShopperSession;

/// Body of `GET /api/session`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub csrf_token: String,
}

/// Start or resume the caller's session and hand out its anti-forgery token.
pub async fn show(shopper: ShopperSession) -> Result<Json<SessionResponse>> {
    let token = shopper.csrf_token().await?;

    Ok(Json(SessionResponse {
        csrf_token: token.value().to_string(),
    }))
}
