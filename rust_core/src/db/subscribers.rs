use super::retry::execute_with_retry;
use crate::error::{RelayError, RelayResult};
use crate::models::SubscriberId;
use crate::relay::SubscriberDirectory;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

const READ_ATTEMPTS: u32 = 3;

/// Subscribers kept in the `users` table: one row per chat user, with an
/// active flag toggled by `/start` and `/stop`.
#[derive(Debug, Clone)]
pub struct PgSubscriberDirectory {
    pool: PgPool,
}

impl PgSubscriberDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> RelayResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY,
                isactive BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("Subscriber schema ready");
        Ok(())
    }

    async fn query_active(&self) -> RelayResult<Vec<SubscriberId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE isactive = TRUE")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn set_active(&self, id: SubscriberId, active: bool) -> RelayResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, isactive)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET isactive = EXCLUDED.isactive
            "#,
        )
        .bind(id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriberDirectory for PgSubscriberDirectory {
    async fn list_active(&self) -> RelayResult<Vec<SubscriberId>> {
        execute_with_retry(|| self.query_active(), READ_ATTEMPTS, 100, 2_000).await
    }

    async fn activate(&self, id: SubscriberId) -> RelayResult<()> {
        self.set_active(id, true).await
    }

    async fn deactivate(&self, id: SubscriberId) -> RelayResult<()> {
        self.set_active(id, false).await
    }

    async fn count_active(&self) -> RelayResult<i64> {
        execute_with_retry(
            || async {
                let count =
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE isactive = TRUE")
                        .fetch_one(&self.pool)
                        .await?;
                Ok::<_, RelayError>(count)
            },
            READ_ATTEMPTS,
            100,
            2_000,
        )
        .await
    }
}
