// File: liverybot-common/src/models/injection.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a single redemption attempt. `Pending` means the debit is
/// committed and the remote dispatch is in flight; a pending row that
/// outlives the dispatch timeout is picked up by the reconciliation sweep.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum InjectionStatus {
    Pending,
    Success,
    Failed,
}

impl fmt::Display for InjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionStatus::Pending => write!(f, "pending"),
            InjectionStatus::Success => write!(f, "success"),
            InjectionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for InjectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(InjectionStatus::Pending),
            "success" => Ok(InjectionStatus::Success),
            "failed" => Ok(InjectionStatus::Failed),
            _ => Err(format!("Invalid injection status: {}", s)),
        }
    }
}

/// Audit record for one redemption attempt. Exactly one row is written per
/// attempt, including attempts rejected before any debit (those carry
/// `points_deducted = 0`).
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Injection {
    pub injection_id: Uuid,
    pub telegram_id: i64,
    pub livery_id: String,
    pub livery_name: Option<String>,
    /// Credential used for dispatch; absent when the attempt failed before
    /// credential resolution.
    pub account_id: Option<Uuid>,
    pub status: InjectionStatus,
    pub points_deducted: i64,
    pub response_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Injection {
    /// Fresh attempt record, not yet persisted.
    pub fn new(telegram_id: i64, livery_id: &str) -> Self {
        Self {
            injection_id: Uuid::new_v4(),
            telegram_id,
            livery_id: livery_id.to_string(),
            livery_name: None,
            account_id: None,
            status: InjectionStatus::Pending,
            points_deducted: 0,
            response_data: None,
            error_message: None,
            execution_time_ms: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Successful result of the remote injection call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionOutcome {
    pub response_data: serde_json::Value,
    pub execution_time_ms: i64,
}
