// src/repositories/postgres/injection.rs
//
// Audit log of redemption attempts. Rows are append-only except for the
// single pending -> {success, failed} settlement update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use liverybot_common::models::Injection;
use liverybot_common::traits::repository_traits::InjectionRepository;
use crate::repositories::postgres::ledger;
use crate::Error;

const INJECTION_COLUMNS: &str = r#"
    injection_id, telegram_id, livery_id, livery_name, account_id,
    status, points_deducted, response_data, error_message,
    execution_time_ms, created_at, completed_at
"#;

async fn insert_row<'c, E>(executor: E, injection: &Injection) -> Result<(), Error>
where
    E: sqlx::PgExecutor<'c>,
{
    sqlx::query(
        r#"
        INSERT INTO injections (
            injection_id, telegram_id, livery_id, livery_name, account_id,
            status, points_deducted, response_data, error_message,
            execution_time_ms, created_at, completed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
        .bind(injection.injection_id)
        .bind(injection.telegram_id)
        .bind(&injection.livery_id)
        .bind(&injection.livery_name)
        .bind(injection.account_id)
        .bind(injection.status)
        .bind(injection.points_deducted)
        .bind(&injection.response_data)
        .bind(&injection.error_message)
        .bind(injection.execution_time_ms)
        .bind(injection.created_at)
        .bind(injection.completed_at)
        .execute(executor)
        .await?;

    Ok(())
}

#[derive(Clone)]
pub struct PostgresInjectionRepository {
    pool: Pool<Postgres>,
}

impl PostgresInjectionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InjectionRepository for PostgresInjectionRepository {
    async fn insert(&self, injection: &Injection) -> Result<(), Error> {
        insert_row(&self.pool, injection).await
    }

    async fn insert_pending_with_debit(&self, injection: &Injection) -> Result<(), Error> {
        let mut db_tx = self.pool.begin().await?;

        // Debit and pending marker commit together, so a crash anywhere
        // around dispatch always leaves either no charge or a reconcilable
        // pending row, never a silent deduction.
        ledger::debit_on(&mut *db_tx, injection.telegram_id, injection.points_deducted).await?;
        insert_row(&mut *db_tx, injection).await?;

        db_tx.commit().await?;
        Ok(())
    }

    async fn refund_and_mark_failed(
        &self,
        injection_id: Uuid,
        error_message: &str,
    ) -> Result<(), Error> {
        let mut db_tx = self.pool.begin().await?;

        // The settlement and the compensating credit either both commit or
        // neither does. The 'pending' guard keeps the pair single-shot: a
        // concurrent settlement matches zero rows and no second refund can
        // ever be applied for the same attempt.
        let row = sqlx::query(
            r#"
            UPDATE injections
            SET status = 'failed',
                error_message = $1,
                completed_at = now()
            WHERE injection_id = $2
              AND status = 'pending'
            RETURNING telegram_id, points_deducted
            "#,
        )
            .bind(error_message)
            .bind(injection_id)
            .fetch_optional(&mut *db_tx)
            .await?;

        match row {
            Some(r) => {
                let telegram_id: i64 = r.try_get("telegram_id")?;
                let points_deducted: i64 = r.try_get("points_deducted")?;
                if points_deducted > 0 {
                    ledger::credit_on(&mut *db_tx, telegram_id, points_deducted).await?;
                }
                db_tx.commit().await?;
                Ok(())
            }
            None => {
                db_tx.rollback().await?;
                Err(Error::NotFound(format!(
                    "pending injection {}",
                    injection_id
                )))
            }
        }
    }

    async fn mark_success(
        &self,
        injection_id: Uuid,
        response_data: &serde_json::Value,
        execution_time_ms: i64,
    ) -> Result<(), Error> {
        // Settlement is guarded on 'pending': success and failed are
        // terminal and must never be rewritten.
        let res = sqlx::query(
            r#"
            UPDATE injections
            SET status = 'success',
                response_data = $1,
                execution_time_ms = $2,
                completed_at = now()
            WHERE injection_id = $3
              AND status = 'pending'
            "#,
        )
            .bind(response_data)
            .bind(execution_time_ms)
            .bind(injection_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "pending injection {}",
                injection_id
            )));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        injection_id: Uuid,
        error_message: &str,
        execution_time_ms: Option<i64>,
    ) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            UPDATE injections
            SET status = 'failed',
                error_message = $1,
                execution_time_ms = $2,
                completed_at = now()
            WHERE injection_id = $3
              AND status = 'pending'
            "#,
        )
            .bind(error_message)
            .bind(execution_time_ms)
            .bind(injection_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "pending injection {}",
                injection_id
            )));
        }
        Ok(())
    }

    async fn get(&self, injection_id: Uuid) -> Result<Option<Injection>, Error> {
        let row = sqlx::query_as::<_, Injection>(&format!(
            r#"
            SELECT {INJECTION_COLUMNS}
            FROM injections
            WHERE injection_id = $1
            "#,
        ))
            .bind(injection_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn count_successes_since(
        &self,
        telegram_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM injections
            WHERE telegram_id = $1
              AND status = 'success'
              AND created_at >= $2
            "#,
        )
            .bind(telegram_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("cnt")?)
    }

    async fn list_for_user(&self, telegram_id: i64, limit: i64) -> Result<Vec<Injection>, Error> {
        let rows = sqlx::query_as::<_, Injection>(&format!(
            r#"
            SELECT {INJECTION_COLUMNS}
            FROM injections
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

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Injection>, Error> {
        let rows = sqlx::query_as::<_, Injection>(&format!(
            r#"
            SELECT {INJECTION_COLUMNS}
            FROM injections
            WHERE status = 'pending'
              AND created_at < $1
            ORDER BY created_at ASC
            "#,
        ))
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
