//! Caller identity extractor.
//!
//! The service sits behind a gateway that authenticates the caller and forwards the user
//! id in the `x-user-id` header. Requests without a valid id are rejected.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use wordbank_core::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts for.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let user_id = raw.trim().parse::<UserId>().map_err(|_| {
            tracing::debug!(value = %raw, "Rejected malformed user id header");
            ApiError::Unauthorized
        })?;

        Ok(Self { user_id })
    }
}
