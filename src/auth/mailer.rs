use async_trait::async_trait;
use tracing::{debug, info};

/// Delivers password reset codes to users.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, username: &str, code: &str) -> anyhow::Result<()>;
}

/// Writes the dispatch to the log instead of sending mail. Development only.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(&self, username: &str, code: &str) -> anyhow::Result<()> {
        info!(%username, "password reset code dispatched");
        debug!(%username, %code, "password reset code");
        Ok(())
    }
}
