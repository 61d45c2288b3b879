use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::state::AppState;

/// Identity supplied by the authentication layer sitting in front of this
/// service, passed along as the `x-user-id` header. In single-tenant mode no
/// identity is required and the store falls back to its local scope.
pub struct UserScope(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for UserScope {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.multi_tenant {
            return Ok(UserScope(None));
        }

        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing x-user-id header".to_string(),
            ))?;

        Ok(UserScope(Some(user_id.to_string())))
    }
}
