//! Daily usage handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::quota::UsageToday;
use crate::state::AppState;

/// Today's quiz and bulk counts for the caller.
pub async fn today(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UsageToday>, ApiError> {
    let usage = state.quota.today(auth.user_id, state.clock.now()).await?;
    Ok(Json(usage))
}
