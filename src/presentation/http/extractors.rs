//! Custom Extractors
//!
//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::presentation::websocket::Phase;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::unauthorized())?;

        let claims = state.verifier.verify(bearer.token())?;
        tracing::debug!(user_id = claims.id, phase = ?Phase::Authenticated, "Token accepted");

        Ok(AuthUser { user_id: claims.id })
    }
}
