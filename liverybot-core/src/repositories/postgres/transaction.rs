// src/repositories/postgres/transaction.rs
//
// Purchase lifecycle: pending -> {confirmed, cancelled}, both terminal.
// Confirmation and the point credit commit as one database transaction,
// guarded by a conditional update on the current status, so a retried or
// racing confirm can never credit twice.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;
use liverybot_common::models::{Product, Transaction, TransactionStatus};
use liverybot_common::traits::repository_traits::TransactionRepository;
use crate::repositories::postgres::ledger;
use crate::Error;

const TX_COLUMNS: &str = r#"
    transaction_id, transaction_uuid, telegram_id, product_id,
    points, amount_idr, status, payment_method, payment_reference,
    confirmed_by_admin, created_at, confirmed_at
"#;

#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: Pool<Postgres>,
}

impl PostgresTransactionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Maps a failed conditional update to the precise business error by
    /// re-reading the row outside the update.
    async fn settled_state_error(&self, transaction_uuid: Uuid) -> Error {
        match self.get_by_uuid(transaction_uuid).await {
            Ok(Some(t)) => match t.status {
                TransactionStatus::Confirmed => Error::AlreadyConfirmed(transaction_uuid),
                other => Error::InvalidTransition(transaction_uuid, other.to_string()),
            },
            Ok(None) => Error::NotFound(format!("transaction {}", transaction_uuid)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, telegram_id: i64, product: &Product) -> Result<Transaction, Error> {
        if !product.is_active {
            return Err(Error::ItemUnavailable(format!(
                "product '{}' is inactive",
                product.name
            )));
        }

        // Snapshot points and price so later product edits never alter
        // this transaction.
        let tx = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (telegram_id, product_id, points, amount_idr)
            VALUES ($1, $2, $3, $4)
            RETURNING {TX_COLUMNS}
            "#,
        ))
            .bind(telegram_id)
            .bind(product.product_id)
            .bind(product.points)
            .bind(product.price_idr)
            .fetch_one(&self.pool)
            .await?;

        Ok(tx)
    }

    async fn get_by_uuid(&self, transaction_uuid: Uuid) -> Result<Option<Transaction>, Error> {
        let row = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TX_COLUMNS}
            FROM transactions
            WHERE transaction_uuid = $1
            "#,
        ))
            .bind(transaction_uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn confirm(&self, transaction_uuid: Uuid, admin_id: i64) -> Result<Transaction, Error> {
        let mut db_tx = self.pool.begin().await?;

        // Status transition and credit either both commit or neither does.
        // The `status = 'pending'` guard makes the transition happen at most
        // once; a concurrent confirm blocks on the row lock and then
        // matches zero rows.
        let updated = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET status = 'confirmed',
                confirmed_by_admin = $1,
                confirmed_at = now()
            WHERE transaction_uuid = $2
              AND status = 'pending'
            RETURNING {TX_COLUMNS}
            "#,
        ))
            .bind(admin_id)
            .bind(transaction_uuid)
            .fetch_optional(&mut *db_tx)
            .await?;

        match updated {
            Some(t) => {
                ledger::credit_on(&mut *db_tx, t.telegram_id, t.points).await?;
                db_tx.commit().await?;
                Ok(t)
            }
            None => {
                db_tx.rollback().await?;
                Err(self.settled_state_error(transaction_uuid).await)
            }
        }
    }

    async fn cancel(&self, transaction_uuid: Uuid) -> Result<Transaction, Error> {
        let updated = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET status = 'cancelled'
            WHERE transaction_uuid = $1
              AND status = 'pending'
            RETURNING {TX_COLUMNS}
            "#,
        ))
            .bind(transaction_uuid)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(t) => Ok(t),
            None => Err(self.settled_state_error(transaction_uuid).await),
        }
    }

    async fn list_for_user(&self, telegram_id: i64, limit: i64) -> Result<Vec<Transaction>, Error> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TX_COLUMNS}
            FROM transactions
            WHERE telegram_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        ))
            .bind(telegram_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn list_pending(&self) -> Result<Vec<Transaction>, Error> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TX_COLUMNS}
            FROM transactions
            WHERE status = 'pending'
            ORDER BY created_at ASC
            "#,
        ))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
