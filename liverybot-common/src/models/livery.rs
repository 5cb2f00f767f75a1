use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One redeemable livery from the upstream catalog. Refreshed by the
/// catalog sync task; read-only for the admission pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct LiveryCacheEntry {
    pub livery_id: String,
    pub livery_name: String,
    pub car_code: String,
    pub car_name: String,
    /// Per-livery override; `None` falls back to the global
    /// `injection_cost_points` setting.
    pub cost_points: Option<i64>,
    pub is_available: bool,
    pub last_updated: DateTime<Utc>,
}

/// Liveries for one car, used by the menu surface.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CarLiveries {
    pub car_code: String,
    pub car_name: String,
    pub liveries: Vec<LiveryCacheEntry>,
}
