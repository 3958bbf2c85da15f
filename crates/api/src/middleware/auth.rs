//! Bearer-token caller extraction for the widget mutation routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use perfolio_core::error::CoreError;
use perfolio_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The caller of a widget mutation, taken from `claims.sub` of the bearer
/// token. Every ownership check in the engine compares against `user_id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = validate_token(token, &state.config.jwt).map_err(|err| {
            tracing::debug!(error = %err, path = %parts.uri.path(), "Rejected widget caller token");
            unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
