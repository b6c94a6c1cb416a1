use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tower_cookies::Cookies;
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, dto::Validate};
use crate::{error::AppError, state::AppState};

/// JSON body that has been deserialized and validated.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            warn!(reason = %rejection.body_text(), "malformed request body");
            AppError::Validation("Invalid data".into())
        })?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Authenticated caller, taken from the access token cookie or a Bearer header.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(str::to_string);

        let token = match bearer {
            Some(t) => t,
            None => {
                let cookies = Cookies::from_request_parts(parts, state)
                    .await
                    .map_err(|_| AppError::Unauthorized("Missing access token"))?;
                cookies
                    .get(TokenKind::Access.cookie_name())
                    .map(|c| c.value().to_string())
                    .ok_or(AppError::Unauthorized("Missing access token"))?
            }
        };

        let claims = state.tokens.verify(&token, TokenKind::Access).map_err(|e| {
            warn!(error = %e, "invalid or expired access token");
            AppError::Unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser(claims.sub))
    }
}
