// src/repositories/postgres/livery_cache.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use liverybot_common::models::{CarLiveries, LiveryCacheEntry};
use liverybot_common::traits::repository_traits::LiveryCacheRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresLiveryCacheRepository {
    pool: Pool<Postgres>,
}

impl PostgresLiveryCacheRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LiveryCacheRepository for PostgresLiveryCacheRepository {
    async fn upsert(&self, entry: &LiveryCacheEntry) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO liveries_cache (
                livery_id, livery_name, car_code, car_name,
                cost_points, is_available, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (livery_id) DO UPDATE
            SET livery_name = EXCLUDED.livery_name,
                car_code = EXCLUDED.car_code,
                car_name = EXCLUDED.car_name,
                is_available = EXCLUDED.is_available,
                last_updated = now()
            "#,
        )
            .bind(&entry.livery_id)
            .bind(&entry.livery_name)
            .bind(&entry.car_code)
            .bind(&entry.car_name)
            .bind(entry.cost_points)
            .bind(entry.is_available)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, livery_id: &str) -> Result<Option<LiveryCacheEntry>, Error> {
        let row = sqlx::query_as::<_, LiveryCacheEntry>(
            r#"
            SELECT livery_id, livery_name, car_code, car_name,
                   cost_points, is_available, last_updated
            FROM liveries_cache
            WHERE livery_id = $1
            "#,
        )
            .bind(livery_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_grouped(&self) -> Result<Vec<CarLiveries>, Error> {
        let rows = sqlx::query_as::<_, LiveryCacheEntry>(
            r#"
            SELECT livery_id, livery_name, car_code, car_name,
                   cost_points, is_available, last_updated
            FROM liveries_cache
            WHERE is_available = TRUE
            ORDER BY car_name ASC, car_code ASC, livery_name ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        let mut cars: Vec<CarLiveries> = Vec::new();
        for entry in rows {
            match cars.last_mut() {
                Some(car) if car.car_code == entry.car_code => car.liveries.push(entry),
                _ => cars.push(CarLiveries {
                    car_code: entry.car_code.clone(),
                    car_name: entry.car_name.clone(),
                    liveries: vec![entry],
                }),
            }
        }
        Ok(cars)
    }

    async fn set_available(&self, livery_id: &str, is_available: bool) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            UPDATE liveries_cache
            SET is_available = $1,
                last_updated = now()
            WHERE livery_id = $2
            "#,
        )
            .bind(is_available)
            .bind(livery_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("livery {}", livery_id)));
        }
        Ok(())
    }
}
