// ================================================================
// File: liverybot-common/src/error.rs
// ================================================================

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Uuid error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Parse error: {0}")]
    Parse(String),

    // ---- ledger / state-machine variants ----
    #[error("Invalid points amount: {0}")]
    InvalidAmount(i64),

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Invalid transition: transaction {0} is '{1}'")]
    InvalidTransition(Uuid, String),

    #[error("Transaction {0} already confirmed")]
    AlreadyConfirmed(Uuid),

    #[error("Maintenance mode is enabled")]
    MaintenanceMode,

    #[error("Daily injection quota exceeded: {used}/{limit}")]
    QuotaExceeded { used: i64, limit: i64 },

    #[error("Livery unavailable: {0}")]
    ItemUnavailable(String),

    #[error("Remote injection failed: {0}")]
    RemoteFailure(String),

    #[error("Remote injection timed out after {0} ms")]
    RemoteTimeout(u64),

    #[error("Injection {0} needs reconciliation: debit committed, dispatch outcome unknown")]
    ReconciliationRequired(Uuid),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}
