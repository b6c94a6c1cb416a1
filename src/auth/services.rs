use std::sync::Arc;

use time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::TokenKind,
        dto::{ForgotPasswordRequest, ResetPasswordRequest, SignInRequest, SignUpRequest},
        otp::generate_otp,
        password::PasswordHashing,
        repo_types::{NewUser, PublicProfile},
    },
    error::AppError,
    state::AppState,
};

/// Same text for known and unknown usernames.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If the user is registered, you will receive a one-time code shortly";

pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_password(hasher: Arc<dyn PasswordHashing>, plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&plain)).await?
}

async fn verify_password(
    hasher: Arc<dyn PasswordHashing>,
    plain: String,
    hash: String,
) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await?
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn sign_up(state: &AppState, req: SignUpRequest) -> Result<PublicProfile, AppError> {
    // Fast path only; the UNIQUE constraint settles concurrent sign-ups.
    if state.users.find_by_username(&req.username).await?.is_some() {
        warn!("username already registered");
        return Err(AppError::Conflict("Failed to create user"));
    }

    let password_hash = hash_password(state.hasher.clone(), req.password).await?;

    let user = state
        .users
        .create(NewUser {
            username: req.username,
            password_hash,
            name: req.name,
            image: req.image,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            AppError::from(e)
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(user.into())
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn sign_in(state: &AppState, req: SignInRequest) -> Result<SessionTokens, AppError> {
    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or_else(|| {
            warn!("sign-in for unknown username");
            AppError::NotFound("User not found")
        })?;

    let ok = verify_password(state.hasher.clone(), req.password, user.password_hash).await?;
    if !ok {
        warn!(user_id = %user.id, "sign-in with invalid password");
        return Err(AppError::Unauthorized("Invalid password"));
    }

    let access_token = state.tokens.sign(user.id, TokenKind::Access)?;
    let refresh_token = state.tokens.sign(user.id, TokenKind::Refresh)?;

    info!(user_id = %user.id, "user signed in");
    Ok(SessionTokens {
        access_token,
        refresh_token,
    })
}

/// Mints a new access token from a refresh token. The refresh token is not rotated.
pub fn refresh(state: &AppState, refresh_token: Option<&str>) -> Result<String, AppError> {
    let token = refresh_token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized("Invalid token"))?;

    let claims = state.tokens.verify(token, TokenKind::Refresh).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::Unauthorized("Invalid token")
    })?;

    let access_token = state.tokens.sign(claims.sub, TokenKind::Access)?;
    info!(user_id = %claims.sub, "access token refreshed");
    Ok(access_token)
}

/// Issues and dispatches a reset code when the user exists.
///
/// The caller cannot tell from the outcome whether the username is registered:
/// store and mailer failures are logged, not returned.
#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn forgot_password(
    state: &AppState,
    req: ForgotPasswordRequest,
) -> Result<(), AppError> {
    let Some(user) = state.users.find_by_username(&req.username).await? else {
        info!("reset requested for unknown username");
        return Ok(());
    };

    let code = generate_otp();
    let ttl = Duration::minutes(state.config.otp.ttl_minutes);
    if let Err(e) = state.otps.store(&user.username, &code, ttl).await {
        error!(error = ?e, "storing reset code failed");
        return Ok(());
    }

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_otp(&user.username, &code).await {
            error!(error = ?e, username = %user.username, "sending reset code failed");
        }
    });
    Ok(())
}

#[instrument(skip(state, req), fields(username = %req.username))]
pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> Result<(), AppError> {
    if !state.otps.consume(&req.username, &req.otp).await? {
        warn!("invalid or expired reset code");
        return Err(AppError::Forbidden("Invalid OTP"));
    }

    if state.users.find_by_username(&req.username).await?.is_none() {
        warn!("reset code redeemed for missing user");
        return Err(AppError::Forbidden("Invalid credentials"));
    }

    let password_hash = hash_password(state.hasher.clone(), req.new_password).await?;
    if !state
        .users
        .update_password(&req.username, &password_hash)
        .await?
    {
        return Err(AppError::Forbidden("Invalid credentials"));
    }

    info!("password reset");
    Ok(())
}

pub async fn get_profile(state: &AppState, username: &str) -> Result<PublicProfile, AppError> {
    state
        .users
        .find_profile(username.trim())
        .await?
        .ok_or(AppError::NotFound("User not found"))
}

pub async fn get_profile_by_id(state: &AppState, id: Uuid) -> Result<PublicProfile, AppError> {
    state
        .users
        .find_profile_by_id(id)
        .await?
        .ok_or(AppError::NotFound("User not found"))
}
