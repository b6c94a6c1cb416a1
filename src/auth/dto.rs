use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 64;
const MAX_NAME_LEN: usize = 100;
const MAX_IMAGE_LEN: usize = 2048;

/// Request bodies check themselves after deserialization.
pub trait Validate {
    fn validate(&mut self) -> Result<(), AppError>;
}

fn invalid(msg: &str) -> AppError {
    AppError::Validation(msg.to_string())
}

fn check_username(username: &mut String) -> Result<(), AppError> {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^\S+$").unwrap();
    }
    *username = username.trim().to_string();
    if username.is_empty() {
        return Err(invalid("Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN || !USERNAME_RE.is_match(username) {
        return Err(invalid("Invalid username"));
    }
    Ok(())
}

fn check_new_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("Password too short"));
    }
    Ok(())
}

pub(crate) fn is_valid_otp(otp: &str) -> bool {
    lazy_static! {
        static ref OTP_RE: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
    }
    OTP_RE.is_match(otp)
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Validate for SignUpRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        check_username(&mut self.username)?;
        check_new_password(&self.password)?;
        self.name = self.name.trim().to_string();
        if self.name.is_empty() || self.name.chars().count() > MAX_NAME_LEN {
            return Err(invalid("Invalid name"));
        }
        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                self.image = None;
            } else if image.len() > MAX_IMAGE_LEN {
                return Err(invalid("Invalid image"));
            }
        }
        Ok(())
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

impl Validate for SignInRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        check_username(&mut self.username)?;
        // Length rules apply when a password is chosen, not when it is presented.
        if self.password.is_empty() {
            return Err(invalid("Password is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub username: String,
}

impl Validate for ForgotPasswordRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        check_username(&mut self.username)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub username: String,
    pub otp: String,
    pub new_password: String,
}

impl Validate for ResetPasswordRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        check_username(&mut self.username)?;
        self.otp = self.otp.trim().to_string();
        if !is_valid_otp(&self.otp) {
            return Err(invalid("Invalid OTP format"));
        }
        check_new_password(&self.new_password)
    }
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}
