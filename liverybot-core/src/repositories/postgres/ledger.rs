// src/repositories/postgres/ledger.rs
//
// Sole owner of `users.points`. Every mutation is a single conditional
// UPDATE, so concurrent calls against the same user serialize on the row
// lock and the balance can never go negative (the schema CHECK backs this
// up at the storage boundary).

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use liverybot_common::traits::repository_traits::Ledger;
use crate::Error;

/// Credit on an arbitrary executor, so callers holding an open database
/// transaction (purchase confirmation) can apply the credit inside it.
pub(crate) async fn credit_on<'c, E>(
    executor: E,
    telegram_id: i64,
    amount: i64,
) -> Result<(), Error>
where
    E: sqlx::PgExecutor<'c>,
{
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount));
    }

    let res = sqlx::query(
        r#"
        UPDATE users
        SET points = points + $1,
            updated_at = now()
        WHERE telegram_id = $2
        "#,
    )
        .bind(amount)
        .bind(telegram_id)
        .execute(executor)
        .await?;

    if res.rows_affected() == 0 {
        return Err(Error::NotFound(format!("user {}", telegram_id)));
    }
    Ok(())
}

/// Conditional debit on an open connection, so callers can commit the
/// deduction together with their own writes. Checks and deducts in one
/// statement; of two racing debits against a marginal balance, the
/// condition holds for at most one.
pub(crate) async fn debit_on(
    conn: &mut sqlx::PgConnection,
    telegram_id: i64,
    amount: i64,
) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount));
    }

    let res = sqlx::query(
        r#"
        UPDATE users
        SET points = points - $1,
            updated_at = now()
        WHERE telegram_id = $2
          AND points >= $1
        "#,
    )
        .bind(amount)
        .bind(telegram_id)
        .execute(&mut *conn)
        .await?;

    if res.rows_affected() == 1 {
        return Ok(());
    }

    // Zero rows: either the user is missing or the balance fell short.
    let row = sqlx::query("SELECT points FROM users WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(r) => {
            let available: i64 = r.try_get("points")?;
            Err(Error::InsufficientBalance {
                required: amount,
                available,
            })
        }
        None => Err(Error::NotFound(format!("user {}", telegram_id))),
    }
}

#[derive(Clone)]
pub struct PostgresLedger {
    pool: Pool<Postgres>,
}

impl PostgresLedger {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for PostgresLedger {
    async fn credit(&self, telegram_id: i64, amount: i64) -> Result<(), Error> {
        credit_on(&self.pool, telegram_id, amount).await
    }

    async fn debit_if_sufficient(&self, telegram_id: i64, amount: i64) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        debit_on(&mut conn, telegram_id, amount).await
    }

    async fn set_points(&self, telegram_id: i64, amount: i64) -> Result<(), Error> {
        if amount < 0 {
            return Err(Error::InvalidAmount(amount));
        }

        let res = sqlx::query(
            r#"
            UPDATE users
            SET points = $1,
                updated_at = now()
            WHERE telegram_id = $2
            "#,
        )
            .bind(amount)
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", telegram_id)));
        }
        Ok(())
    }

    async fn balance(&self, telegram_id: i64) -> Result<i64, Error> {
        let row = sqlx::query("SELECT points FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(r.try_get("points")?),
            None => Err(Error::NotFound(format!("user {}", telegram_id))),
        }
    }
}
