// src/repositories/postgres/settings.rs
//
// Keyed configuration, last-writer-wins. The typed accessors re-read the
// table on every call: admission decisions must see the value as of the
// decision, not a cached copy.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use liverybot_common::models::Setting;
use liverybot_common::traits::repository_traits::SettingsRepository;
use crate::Error;

pub const KEY_INJECTION_COST: &str = "injection_cost_points";
pub const KEY_DAILY_LIMIT: &str = "max_injections_per_day";
pub const KEY_MAINTENANCE: &str = "maintenance_mode";

const DEFAULT_INJECTION_COST: i64 = 1000;
const DEFAULT_DAILY_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct PostgresSettingsRepository {
    pool: Pool<Postgres>,
}

impl PostgresSettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    async fn get_value(&self, setting_key: &str) -> Result<Option<String>, Error> {
        let row = sqlx::query(
            r#"
            SELECT setting_value
            FROM admin_settings
            WHERE setting_key = $1
            "#,
        )
            .bind(setting_key)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row {
            Ok(Some(r.try_get("setting_value")?))
        } else {
            Ok(None)
        }
    }

    async fn set_value(
        &self,
        setting_key: &str,
        setting_value: &str,
        updated_by: Option<i64>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO admin_settings (setting_key, setting_value, updated_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (setting_key) DO UPDATE
            SET setting_value = EXCLUDED.setting_value,
                updated_by = EXCLUDED.updated_by,
                updated_at = now()
            "#,
        )
            .bind(setting_key)
            .bind(setting_value)
            .bind(updated_by)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_setting(&self, setting_key: &str) -> Result<Option<Setting>, Error> {
        let row = sqlx::query_as::<_, Setting>(
            r#"
            SELECT setting_key, setting_value, description, updated_by, updated_at
            FROM admin_settings
            WHERE setting_key = $1
            "#,
        )
            .bind(setting_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_all(&self) -> Result<Vec<(String, String)>, Error> {
        let rows = sqlx::query(
            r#"SELECT setting_key, setting_value FROM admin_settings ORDER BY setting_key"#,
        )
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let k: String = row.try_get("setting_key")?;
            let v: String = row.try_get("setting_value")?;
            out.push((k, v));
        }
        Ok(out)
    }

    async fn delete_value(&self, setting_key: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            DELETE FROM admin_settings
            WHERE setting_key = $1
            "#,
        )
            .bind(setting_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn injection_cost(&self) -> Result<i64, Error> {
        match self.get_value(KEY_INJECTION_COST).await? {
            Some(v) => v
                .parse::<i64>()
                .map_err(|_| Error::Parse(format!("bad {} value: {}", KEY_INJECTION_COST, v))),
            None => Ok(DEFAULT_INJECTION_COST),
        }
    }

    async fn daily_injection_limit(&self) -> Result<i64, Error> {
        match self.get_value(KEY_DAILY_LIMIT).await? {
            Some(v) => v
                .parse::<i64>()
                .map_err(|_| Error::Parse(format!("bad {} value: {}", KEY_DAILY_LIMIT, v))),
            None => Ok(DEFAULT_DAILY_LIMIT),
        }
    }

    async fn maintenance_mode(&self) -> Result<bool, Error> {
        match self.get_value(KEY_MAINTENANCE).await? {
            Some(v) => Ok(matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "on")),
            None => Ok(false),
        }
    }
}
