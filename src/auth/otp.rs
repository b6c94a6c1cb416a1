use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

pub const OTP_DIGITS: usize = 6;

/// Wrong guesses a live code survives; the next mismatch deletes it.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

/// Random numeric code, zero padded to [`OTP_DIGITS`].
pub fn generate_otp() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:0width$}", width = OTP_DIGITS)
}

/// Ephemeral username -> one-time code mapping.
///
/// A username has at most one live code: `store` replaces whatever was there.
/// `consume` checks and deletes in one step, so a code can be redeemed once.
/// After [`MAX_OTP_ATTEMPTS`] mismatches the code is dropped.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn store(&self, username: &str, code: &str, ttl: Duration) -> anyhow::Result<()>;
    /// True when `code` matched a live entry, which is now gone.
    async fn consume(&self, username: &str, code: &str) -> anyhow::Result<bool>;
}

struct OtpEntry {
    code: String,
    attempts: i32,
    expires_at: OffsetDateTime,
}

/// Process-local store; only correct for a single server instance.
#[derive(Default)]
pub struct MemoryOtpStore {
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn store(&self, username: &str, code: &str, ttl: Duration) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            username.to_string(),
            OtpEntry {
                code: code.to_string(),
                attempts: 0,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn consume(&self, username: &str, code: &str) -> anyhow::Result<bool> {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(username) else {
            return Ok(false);
        };
        if entry.expires_at <= now {
            entries.remove(username);
            return Ok(false);
        }
        if entry.code != code {
            entry.attempts += 1;
            if entry.attempts >= MAX_OTP_ATTEMPTS {
                entries.remove(username);
            }
            return Ok(false);
        }
        entries.remove(username);
        Ok(true)
    }
}

#[derive(Clone)]
pub struct PgOtpStore {
    db: PgPool,
}

impl PgOtpStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn store(&self, username: &str, code: &str, ttl: Duration) -> anyhow::Result<()> {
        // Expiry uses the database clock, the same one purge and consume compare against.
        let mut tx = self.db.begin().await?;
        sqlx::query(r#"DELETE FROM password_reset_otps WHERE expires_at <= now()"#)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO password_reset_otps (username, code, attempts, expires_at)
            VALUES ($1, $2, 0, now() + make_interval(secs => $3))
            ON CONFLICT (username)
            DO UPDATE SET code = EXCLUDED.code,
                          attempts = 0,
                          expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(username)
        .bind(code)
        .bind(ttl.as_seconds_f64())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn consume(&self, username: &str, code: &str) -> anyhow::Result<bool> {
        // Single conditional delete: two concurrent resets cannot both win.
        let row = sqlx::query_scalar::<_, String>(
            r#"
            DELETE FROM password_reset_otps
            WHERE username = $1 AND code = $2 AND expires_at > now() AND attempts < $3
            RETURNING username
            "#,
        )
        .bind(username)
        .bind(code)
        .bind(MAX_OTP_ATTEMPTS)
        .fetch_optional(&self.db)
        .await?;
        if row.is_some() {
            return Ok(true);
        }

        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE password_reset_otps
            SET attempts = attempts + 1
            WHERE username = $1 AND expires_at > now()
            RETURNING attempts
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        if attempts.is_some_and(|n| n >= MAX_OTP_ATTEMPTS) {
            sqlx::query(r#"DELETE FROM password_reset_otps WHERE username = $1 AND attempts >= $2"#)
                .bind(username)
                .bind(MAX_OTP_ATTEMPTS)
                .execute(&self.db)
                .await?;
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_otp();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn code_can_be_consumed_once() {
        let store = MemoryOtpStore::new();
        store.store("alice", "123456", Duration::minutes(5)).await.unwrap();
        assert!(store.consume("alice", "123456").await.unwrap());
        assert!(!store.consume("alice", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_code_does_not_burn_entry() {
        let store = MemoryOtpStore::new();
        store.store("alice", "123456", Duration::minutes(5)).await.unwrap();
        assert!(!store.consume("alice", "654321").await.unwrap());
        assert!(!store.consume("bob", "123456").await.unwrap());
        assert!(store.consume("alice", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let store = MemoryOtpStore::new();
        store.store("alice", "123456", Duration::seconds(-1)).await.unwrap();
        assert!(!store.consume("alice", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn too_many_wrong_guesses_burn_the_code() {
        let store = MemoryOtpStore::new();
        store.store("alice", "999999", Duration::minutes(5)).await.unwrap();
        for guess in 0..MAX_OTP_ATTEMPTS {
            let guess = format!("{guess:06}");
            assert!(!store.consume("alice", &guess).await.unwrap());
        }
        assert!(!store.consume("alice", "999999").await.unwrap());
    }

    #[tokio::test]
    async fn guesses_below_the_limit_keep_the_code() {
        let store = MemoryOtpStore::new();
        store.store("alice", "999999", Duration::minutes(5)).await.unwrap();
        for _ in 1..MAX_OTP_ATTEMPTS {
            assert!(!store.consume("alice", "000000").await.unwrap());
        }
        assert!(store.consume("alice", "999999").await.unwrap());
    }

    #[tokio::test]
    async fn new_code_resets_attempts() {
        let store = MemoryOtpStore::new();
        store.store("alice", "111111", Duration::minutes(5)).await.unwrap();
        for _ in 1..MAX_OTP_ATTEMPTS {
            assert!(!store.consume("alice", "000000").await.unwrap());
        }
        store.store("alice", "222222", Duration::minutes(5)).await.unwrap();
        for _ in 1..MAX_OTP_ATTEMPTS {
            assert!(!store.consume("alice", "000000").await.unwrap());
        }
        assert!(store.consume("alice", "222222").await.unwrap());
    }

    #[tokio::test]
    async fn new_code_replaces_previous_one() {
        let store = MemoryOtpStore::new();
        store.store("alice", "111111", Duration::minutes(5)).await.unwrap();
        store.store("alice", "222222", Duration::minutes(5)).await.unwrap();
        assert!(!store.consume("alice", "111111").await.unwrap());
        assert!(store.consume("alice", "222222").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entries_are_purged_on_store() {
        let store = MemoryOtpStore::new();
        store.store("old", "111111", Duration::seconds(-1)).await.unwrap();
        store.store("new", "222222", Duration::minutes(5)).await.unwrap();
        let entries = store.entries.lock().await;
        assert!(!entries.contains_key("old"));
        assert!(entries.contains_key("new"));
    }

    #[tokio::test]
    async fn concurrent_consumers_have_one_winner() {
        let store = Arc::new(MemoryOtpStore::new());
        store.store("alice", "424242", Duration::minutes(5)).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.consume("alice", "424242").await.unwrap() })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
