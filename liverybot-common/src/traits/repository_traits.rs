use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::error::Error;
use crate::models::injection::Injection;
use crate::models::livery::{CarLiveries, LiveryCacheEntry};
use crate::models::playfab::PlayfabAccount;
use crate::models::product::Product;
use crate::models::setting::Setting;
use crate::models::transaction::Transaction;
use crate::models::user::User;

/// Atomic balance mutation primitives. The only component allowed to write
/// `users.points`; everything else goes through these.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Increases the balance by `amount`. `amount <= 0` is `InvalidAmount`.
    async fn credit(&self, telegram_id: i64, amount: i64) -> Result<(), Error>;

    /// Checks `balance >= amount` and deducts in the same atomic statement.
    /// Fails with `InsufficientBalance` and leaves the balance untouched
    /// otherwise.
    async fn debit_if_sufficient(&self, telegram_id: i64, amount: i64) -> Result<(), Error>;

    /// Admin override; `amount` must be non-negative.
    async fn set_points(&self, telegram_id: i64, amount: i64) -> Result<(), Error>;

    async fn balance(&self, telegram_id: i64) -> Result<i64, Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_or_create<'a>(
        &self,
        telegram_id: i64,
        username: Option<&'a str>,
        first_name: Option<&'a str>,
        last_name: Option<&'a str>,
    ) -> Result<User, Error>;

    async fn get(&self, telegram_id: i64) -> Result<Option<User>, Error>;
    async fn list_all(&self) -> Result<Vec<User>, Error>;
    async fn set_admin(&self, telegram_id: i64, is_admin: bool) -> Result<(), Error>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create<'a>(
        &self,
        name: &'a str,
        points: i64,
        price_idr: i64,
        description: Option<&'a str>,
    ) -> Result<Product, Error>;

    async fn get(&self, product_id: i64) -> Result<Option<Product>, Error>;
    async fn list_active(&self) -> Result<Vec<Product>, Error>;

    /// Updates the mutable fields (points, price, description, active flag).
    /// The name stays fixed once the product exists.
    async fn update(&self, product: &Product) -> Result<(), Error>;
    async fn deactivate(&self, product_id: i64) -> Result<(), Error>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a `pending` transaction with the product's points and price
    /// snapshotted onto the row.
    async fn create(&self, telegram_id: i64, product: &Product) -> Result<Transaction, Error>;

    async fn get_by_uuid(&self, transaction_uuid: Uuid) -> Result<Option<Transaction>, Error>;

    /// `pending -> confirmed` plus the point credit, committed as one
    /// database transaction. Conflicting or repeated calls report
    /// `AlreadyConfirmed` / `InvalidTransition` without a second credit.
    async fn confirm(&self, transaction_uuid: Uuid, admin_id: i64) -> Result<Transaction, Error>;

    /// `pending -> cancelled`; no balance effect.
    async fn cancel(&self, transaction_uuid: Uuid) -> Result<Transaction, Error>;

    async fn list_for_user(&self, telegram_id: i64, limit: i64) -> Result<Vec<Transaction>, Error>;
    async fn list_pending(&self) -> Result<Vec<Transaction>, Error>;
}

#[async_trait]
pub trait InjectionRepository: Send + Sync {
    async fn insert(&self, injection: &Injection) -> Result<(), Error>;

    /// Debits `points_deducted` from the user's balance and inserts the
    /// `pending` row, committed as one database transaction. A crash can
    /// therefore never leave a deduction without its pending marker.
    async fn insert_pending_with_debit(&self, injection: &Injection) -> Result<(), Error>;

    /// `pending -> failed` plus the compensating credit of
    /// `points_deducted`, committed as one database transaction. Reports
    /// `NotFound` when the row is already settled, so a repeated call can
    /// never refund twice.
    async fn refund_and_mark_failed(
        &self,
        injection_id: Uuid,
        error_message: &str,
    ) -> Result<(), Error>;

    async fn mark_success(
        &self,
        injection_id: Uuid,
        response_data: &serde_json::Value,
        execution_time_ms: i64,
    ) -> Result<(), Error>;

    async fn mark_failed(
        &self,
        injection_id: Uuid,
        error_message: &str,
        execution_time_ms: Option<i64>,
    ) -> Result<(), Error>;

    async fn get(&self, injection_id: Uuid) -> Result<Option<Injection>, Error>;
    async fn count_successes_since(
        &self,
        telegram_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64, Error>;
    async fn list_for_user(&self, telegram_id: i64, limit: i64) -> Result<Vec<Injection>, Error>;

    /// Pending rows created before `cutoff`: debit committed, dispatch
    /// outcome unknown. Input to the reconciliation sweep.
    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Injection>, Error>;
}

#[async_trait]
pub trait LiveryCacheRepository: Send + Sync {
    async fn upsert(&self, entry: &LiveryCacheEntry) -> Result<(), Error>;
    async fn get(&self, livery_id: &str) -> Result<Option<LiveryCacheEntry>, Error>;
    async fn list_grouped(&self) -> Result<Vec<CarLiveries>, Error>;
    async fn set_available(&self, livery_id: &str, is_available: bool) -> Result<(), Error>;
}

#[async_trait]
pub trait PlayfabAccountRepository: Send + Sync {
    async fn get_active(&self, telegram_id: i64) -> Result<Option<PlayfabAccount>, Error>;

    /// Deactivates any current token and inserts the new one as active,
    /// in one database transaction.
    async fn rotate_token(&self, telegram_id: i64, token: &str) -> Result<PlayfabAccount, Error>;

    async fn deactivate(&self, telegram_id: i64) -> Result<(), Error>;
    async fn list_for_user(&self, telegram_id: i64) -> Result<Vec<PlayfabAccount>, Error>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_value(&self, setting_key: &str) -> Result<Option<String>, Error>;
    async fn set_value(
        &self,
        setting_key: &str,
        setting_value: &str,
        updated_by: Option<i64>,
    ) -> Result<(), Error>;
    async fn get_setting(&self, setting_key: &str) -> Result<Option<Setting>, Error>;
    async fn list_all(&self) -> Result<Vec<(String, String)>, Error>;
    async fn delete_value(&self, setting_key: &str) -> Result<(), Error>;

    // Typed accessors for the admission-relevant keys. Callers read these
    // fresh at each decision point; values are never cached across requests.
    async fn injection_cost(&self) -> Result<i64, Error>;
    async fn daily_injection_limit(&self) -> Result<i64, Error>;
    async fn maintenance_mode(&self) -> Result<bool, Error>;
}
