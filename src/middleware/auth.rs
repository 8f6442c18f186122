// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{common::error::AppError, config::AppState, models::auth::Actor};

// Extrator para obter quem está agindo diretamente nos handlers.
// O token é validado uma vez; o `Actor` fica nos "extensions" da requisição.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidToken)?;

        let app_state = AppState::from_ref(state);
        let actor = app_state.auth_service.validate_token(bearer.token())?;

        let user = AuthenticatedUser(actor);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
