// src/repositories/postgres/playfab_account.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use liverybot_common::models::PlayfabAccount;
use liverybot_common::traits::repository_traits::PlayfabAccountRepository;
use crate::Error;

const ACCOUNT_COLUMNS: &str = r#"
    account_id, telegram_id, playfab_token, is_active, created_at, updated_at
"#;

#[derive(Clone)]
pub struct PostgresPlayfabAccountRepository {
    pool: Pool<Postgres>,
}

impl PostgresPlayfabAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlayfabAccountRepository for PostgresPlayfabAccountRepository {
    async fn get_active(&self, telegram_id: i64) -> Result<Option<PlayfabAccount>, Error> {
        let row = sqlx::query_as::<_, PlayfabAccount>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM playfab_accounts
            WHERE telegram_id = $1
              AND is_active = TRUE
            "#,
        ))
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn rotate_token(&self, telegram_id: i64, token: &str) -> Result<PlayfabAccount, Error> {
        let mut db_tx = self.pool.begin().await?;

        // Old rows stay around, deactivated, for audit. The partial unique
        // index on (telegram_id) WHERE is_active makes the deactivate+insert
        // pair mandatory to order this way.
        sqlx::query(
            r#"
            UPDATE playfab_accounts
            SET is_active = FALSE,
                updated_at = now()
            WHERE telegram_id = $1
              AND is_active = TRUE
            "#,
        )
            .bind(telegram_id)
            .execute(&mut *db_tx)
            .await?;

        let account = sqlx::query_as::<_, PlayfabAccount>(&format!(
            r#"
            INSERT INTO playfab_accounts (account_id, telegram_id, playfab_token)
            VALUES ($1, $2, $3)
            RETURNING {ACCOUNT_COLUMNS}
            "#,
        ))
            .bind(Uuid::new_v4())
            .bind(telegram_id)
            .bind(token)
            .fetch_one(&mut *db_tx)
            .await?;

        db_tx.commit().await?;
        Ok(account)
    }

    async fn deactivate(&self, telegram_id: i64) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE playfab_accounts
            SET is_active = FALSE,
                updated_at = now()
            WHERE telegram_id = $1
              AND is_active = TRUE
            "#,
        )
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_for_user(&self, telegram_id: i64) -> Result<Vec<PlayfabAccount>, Error> {
        let rows = sqlx::query_as::<_, PlayfabAccount>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM playfab_accounts
            WHERE telegram_id = $1
            ORDER BY created_at DESC
            "#,
        ))
            .bind(telegram_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
