// src/repositories/postgres/product.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use liverybot_common::models::Product;
use liverybot_common::traits::repository_traits::ProductRepository;
use crate::Error;

#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: Pool<Postgres>,
}

impl PostgresProductRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn create<'a>(
        &self,
        name: &'a str,
        points: i64,
        price_idr: i64,
        description: Option<&'a str>,
    ) -> Result<Product, Error> {
        if points <= 0 {
            return Err(Error::InvalidAmount(points));
        }

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, points, price_idr, description)
            VALUES ($1, $2, $3, $4)
            RETURNING product_id, name, points, price_idr, description,
                      is_active, created_at, updated_at
            "#,
        )
            .bind(name)
            .bind(points)
            .bind(price_idr)
            .bind(description)
            .fetch_one(&self.pool)
            .await?;

        Ok(product)
    }

    async fn get(&self, product_id: i64) -> Result<Option<Product>, Error> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, points, price_idr, description,
                   is_active, created_at, updated_at
            FROM products
            WHERE product_id = $1
            "#,
        )
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_active(&self) -> Result<Vec<Product>, Error> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, points, price_idr, description,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = TRUE
            ORDER BY points ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn update(&self, product: &Product) -> Result<(), Error> {
        if product.points <= 0 {
            return Err(Error::InvalidAmount(product.points));
        }

        let res = sqlx::query(
            r#"
            UPDATE products
            SET points = $1,
                price_idr = $2,
                description = $3,
                is_active = $4,
                updated_at = now()
            WHERE product_id = $5
            "#,
        )
            .bind(product.points)
            .bind(product.price_idr)
            .bind(&product.description)
            .bind(product.is_active)
            .bind(product.product_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("product {}", product.product_id)));
        }
        Ok(())
    }

    async fn deactivate(&self, product_id: i64) -> Result<(), Error> {
        let res = sqlx::query(
            r#"
            UPDATE products
            SET is_active = FALSE,
                updated_at = now()
            WHERE product_id = $1
            "#,
        )
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("product {}", product_id)));
        }
        Ok(())
    }
}
