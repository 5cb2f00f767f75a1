use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A purchasable point bundle. Deactivated rather than deleted so that
/// historical transactions keep a valid reference.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub points: i64,
    pub price_idr: i64,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
