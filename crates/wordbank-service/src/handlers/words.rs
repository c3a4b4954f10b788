//! Bulk word handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use wordbank_core::{BulkRegisterReport, ClassifiedTokens};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Bulk tokenize request.
#[derive(Debug, Deserialize)]
pub struct BulkTokenizeRequest {
    /// Free text pasted by the user.
    pub text: String,
}

/// Bulk register request.
#[derive(Debug, Deserialize)]
pub struct BulkRegisterRequest {
    /// Words to register, in any case and possibly repeated.
    pub words: Vec<String>,
}

/// Split pasted text into candidates, registered words and unknown words.
pub async fn bulk_tokenize(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<BulkTokenizeRequest>,
) -> Result<Json<ClassifiedTokens>, ApiError> {
    tracing::debug!(
        user_id = %auth.user_id,
        text_bytes = body.text.len(),
        "Processing bulk tokenize"
    );

    let classified = state
        .classifier
        .classify(auth.user_id, &body.text, state.clock.now())
        .await?;

    Ok(Json(classified))
}

/// Register a batch of words on the caller's list.
pub async fn bulk_register(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<BulkRegisterRequest>,
) -> Result<Json<BulkRegisterReport>, ApiError> {
    tracing::debug!(
        user_id = %auth.user_id,
        requested = body.words.len(),
        "Processing bulk register"
    );

    let report = state
        .registrar
        .register(auth.user_id, &body.words, state.clock.now())
        .await?;

    Ok(Json(report))
}
