use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{
    jwt::{JwtKeys, TokenIssuer},
    mailer::{LogMailer, OtpMailer},
    otp::{MemoryOtpStore, OtpStore, PgOtpStore},
    password::{Argon2Hasher, PasswordHashing},
    repo::{PgUserRepo, UserRepo},
};
use crate::config::{AppConfig, OtpBackend};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub otps: Arc<dyn OtpStore>,
    pub hasher: Arc<dyn PasswordHashing>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub mailer: Arc<dyn OtpMailer>,
}

impl AppState {
    /// Wires the production collaborators around an existing pool.
    pub fn with_pool(config: Arc<AppConfig>, db: PgPool) -> Self {
        let otps: Arc<dyn OtpStore> = match config.otp.backend {
            OtpBackend::Memory => Arc::new(MemoryOtpStore::new()),
            OtpBackend::Postgres => Arc::new(PgOtpStore::new(db.clone())),
        };
        Self {
            users: Arc::new(PgUserRepo::new(db)),
            otps,
            hasher: Arc::new(Argon2Hasher::default()),
            tokens: Arc::new(JwtKeys::from_config(&config.jwt)),
            mailer: Arc::new(LogMailer),
            config,
        }
    }
}
