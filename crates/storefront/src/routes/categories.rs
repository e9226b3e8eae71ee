//! Category listing handler.

use axum::{Json, extract::State};

use crate::services::CategoryOverview;
use crate::state::AppState;

/// Categories with their product counts.
///
/// Never fails: when the catalog is unreachable the last known counts are
/// served, or an empty list, with `degraded` set.
pub async fn index(State(state): State<AppState>) -> Json<CategoryOverview> {
    Json(state.categories().get_category_counts().await)
}
