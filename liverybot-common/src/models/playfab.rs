use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A PlayFab session token bound to a user. At most one row per user is
/// active at a time; rotation keeps the old rows around for audit.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct PlayfabAccount {
    pub account_id: Uuid,
    pub telegram_id: i64,
    pub playfab_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
