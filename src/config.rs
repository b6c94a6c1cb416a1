use anyhow::{bail, Context};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct JwtConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Where the OTP codes live between forgot-password and reset-password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub backend: OtpBackend,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub login_redirect: String,
    pub logout_redirect: String,
}

#[derive(Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    pub cookies: CookieConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            access_secret: required_secret("JWT_ACCESS_SECRET")?,
            refresh_secret: required_secret("JWT_REFRESH_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "auth-backend".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "auth-backend-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        if jwt.ttl_minutes <= 0 || jwt.refresh_ttl_minutes <= 0 {
            bail!("token lifetimes must be positive");
        }

        let backend = match std::env::var("OTP_STORE").as_deref() {
            Ok("memory") => OtpBackend::Memory,
            Ok("postgres") | Err(_) => OtpBackend::Postgres,
            Ok(other) => bail!("unknown OTP_STORE {other:?}, expected memory or postgres"),
        };
        let otp = OtpConfig {
            backend,
            ttl_minutes: parse_or("OTP_TTL_MINUTES", 5),
        };
        if otp.ttl_minutes <= 0 {
            bail!("OTP_TTL_MINUTES must be positive");
        }

        let cookies = CookieConfig {
            secure: std::env::var("COOKIE_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            login_redirect: std::env::var("LOGIN_REDIRECT").unwrap_or_else(|_| "/home".into()),
            logout_redirect: std::env::var("LOGOUT_REDIRECT")
                .unwrap_or_else(|_| "/sign-in".into()),
        };

        Ok(Self {
            database_url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            otp,
            cookies,
        })
    }
}

// Signing keys have no default: a missing key must stop the server.
fn required_secret(name: &str) -> anyhow::Result<SecretString> {
    let value = std::env::var(name).with_context(|| format!("{name} is not set"))?;
    let secret = SecretString::from(value);
    if secret.expose_secret().trim().is_empty() {
        bail!("{name} must not be empty");
    }
    Ok(secret)
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
