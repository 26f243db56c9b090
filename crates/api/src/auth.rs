//! Caller identity.
//!
//! Authentication happens upstream. The gateway forwards the caller's id in the
//! `x-user-id` header and the role is looked up in the store.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::User;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the authenticated caller's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Any known caller.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

/// A caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminActor(pub User);

async fn resolve<S: Store>(parts: &Parts, state: &AppState<S>) -> Result<User, ApiError> {
    let header = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".to_string()))?;
    let user_id: UserId = header
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| ApiError::Unauthorized("Malformed x-user-id header".to_string()))?;

    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(Actor)
    }
}

impl<S: Store> FromRequestParts<Arc<AppState<S>>> for AdminActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve(parts, state).await?;
        if !user.is_admin() {
            tracing::debug!(user_id = %user.id, role = %user.role, "admin route refused");
            return Err(ApiError::AccessDenied("Admin access required".to_string()));
        }
        Ok(AdminActor(user))
    }
}
