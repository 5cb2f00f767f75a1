// src/repositories/postgres/user.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use liverybot_common::models::User;
use liverybot_common::traits::repository_traits::UserRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresUserRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get_or_create<'a>(
        &self,
        telegram_id: i64,
        username: Option<&'a str>,
        first_name: Option<&'a str>,
        last_name: Option<&'a str>,
    ) -> Result<User, Error> {
        if let Some(existing) = self.get(telegram_id).await? {
            return Ok(existing);
        }

        // Another request may have raced the insert; the conflict clause
        // keeps first contact idempotent either way.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (telegram_id) DO UPDATE
            SET username = EXCLUDED.username,
                updated_at = now()
            RETURNING telegram_id, username, first_name, last_name,
                      points, is_admin, created_at, updated_at
            "#,
        )
            .bind(telegram_id)
            .bind(username)
            .bind(first_name)
            .bind(last_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get(&self, telegram_id: i64) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT telegram_id, username, first_name, last_name,
                   points, is_admin, created_at, updated_at
            FROM users
            WHERE telegram_id = $1
            "#,
        )
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_all(&self) -> Result<Vec<User>, Error> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT telegram_id, username, first_name, last_name,
                   points, is_admin, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn set_admin(&self, telegram_id: i64, is_admin: bool) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET is_admin = $1,
                updated_at = now()
            WHERE telegram_id = $2
            "#,
        )
            .bind(is_admin)
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", telegram_id)));
        }
        Ok(())
    }
}
