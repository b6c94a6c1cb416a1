use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tower_cookies::Cookies;
use tracing::instrument;

use crate::{
    auth::{
        claims::TokenKind,
        cookies::{expired_cookie, token_cookie},
        dto::{
            ForgotPasswordRequest, MessageResponse, RefreshResponse, ResetPasswordRequest,
            SignInRequest, SignUpRequest,
        },
        extractors::{AuthUser, ValidJson},
        repo_types::PublicProfile,
        services::{self, FORGOT_PASSWORD_MESSAGE},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/logout", get(logout).post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/:username", get(get_profile))
        .route("/me", get(get_me))
}

pub async fn sign_up(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignUpRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    services::sign_up(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created successfully")),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidJson(payload): ValidJson<SignInRequest>,
) -> Result<Redirect, AppError> {
    let session = services::sign_in(&state, payload).await?;
    let secure = state.config.cookies.secure;
    cookies.add(token_cookie(
        TokenKind::Access,
        session.access_token,
        state.tokens.ttl(TokenKind::Access),
        secure,
    ));
    cookies.add(token_cookie(
        TokenKind::Refresh,
        session.refresh_token,
        state.tokens.ttl(TokenKind::Refresh),
        secure,
    ));
    Ok(Redirect::to(&state.config.cookies.login_redirect))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Redirect {
    let secure = state.config.cookies.secure;
    for kind in [TokenKind::Access, TokenKind::Refresh] {
        cookies.add(expired_cookie(kind, secure));
    }
    tracing::debug!("session cookies cleared");
    Redirect::to(&state.config.cookies.logout_redirect)
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Json<RefreshResponse>, AppError> {
    let presented = cookies
        .get(TokenKind::Refresh.cookie_name())
        .map(|c| c.value().to_string());
    let access_token = services::refresh(&state, presented.as_deref())?;
    cookies.add(token_cookie(
        TokenKind::Access,
        access_token.clone(),
        state.tokens.ttl(TokenKind::Access),
        state.config.cookies.secure,
    ));
    Ok(Json(RefreshResponse { access_token }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::forgot_password(&state, payload).await?;
    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::reset_password(&state, payload).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, AppError> {
    services::get_profile(&state, &username).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicProfile>, AppError> {
    services::get_profile_by_id(&state, user_id).await.map(Json)
}
