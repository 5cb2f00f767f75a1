// tests/helpers/mod.rs (a small test-only module)

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use liverybot_core::{Database, Error};

pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://liverybot@localhost/liverybot_test".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    Ok(pool)
}

/// Wipes the public schema and re-applies migrations, so each test starts
/// from a known-empty database.
pub async fn setup_test_db() -> Result<Database, Error> {
    let pool = create_test_db_pool().await?;

    sqlx::query("DROP SCHEMA public CASCADE;")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE SCHEMA public;")
        .execute(&pool)
        .await?;

    let db = Database::from_pool(pool);
    db.migrate().await?;
    Ok(db)
}

pub async fn seed_user(pool: &Pool<Postgres>, telegram_id: i64, points: i64) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO users (telegram_id, username, points)
        VALUES ($1, $2, $3)
        "#,
    )
        .bind(telegram_id)
        .bind(format!("user{}", telegram_id))
        .bind(points)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn seed_livery(pool: &Pool<Postgres>, livery_id: &str, cost: Option<i64>) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO liveries_cache (livery_id, livery_name, car_code, car_name, cost_points)
        VALUES ($1, $2, 'gt3', 'GT3', $3)
        "#,
    )
        .bind(livery_id)
        .bind(format!("Livery {}", livery_id))
        .bind(cost)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn current_points(pool: &Pool<Postgres>, telegram_id: i64) -> Result<i64, Error> {
    let points: i64 = sqlx::query_scalar("SELECT points FROM users WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_one(pool)
        .await?;
    Ok(points)
}
