use std::sync::Arc;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod state;
#[cfg(test)]
mod test_support;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "auth_backend=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    if !config.cookies.secure {
        tracing::warn!("COOKIE_SECURE is off; session cookies will be sent over plain HTTP");
    }

    let db = db::connect(&config).await?;
    db::migrate(&db).await;

    let app = app::build_app(AppState::with_pool(config, db));
    app::serve(app).await
}
