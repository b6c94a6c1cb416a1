use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, PublicProfile, User};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("username already taken")]
    Duplicate,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Credential store: users keyed by their unique username.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_profile(&self, username: &str) -> Result<Option<PublicProfile>, RepoError>;
    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<PublicProfile>, RepoError>;
    /// Returns false when no user has this username.
    async fn update_password(&self, username: &str, password_hash: &str)
        -> Result<bool, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, name, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, name, image, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.image)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::Duplicate,
            e => RepoError::Database(e),
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, name, image, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_profile(&self, username: &str) -> Result<Option<PublicProfile>, RepoError> {
        // Select only public columns so the hash is never read for this path.
        let profile = sqlx::query_as::<_, PublicProfile>(
            r#"
            SELECT id, username, name, image, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<PublicProfile>, RepoError> {
        let profile = sqlx::query_as::<_, PublicProfile>(
            r#"SELECT id, username, name, image, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE username = $1"#)
            .bind(username)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
