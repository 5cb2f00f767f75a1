use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Setting {
    pub setting_key: String,
    pub setting_value: String,
    pub description: Option<String>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}
