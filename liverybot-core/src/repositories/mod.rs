// src/repositories/mod.rs

pub mod postgres;

pub use postgres::ledger::PostgresLedger;
pub use postgres::user::PostgresUserRepository;
pub use postgres::product::PostgresProductRepository;
pub use postgres::transaction::PostgresTransactionRepository;
pub use postgres::injection::PostgresInjectionRepository;
pub use postgres::livery_cache::PostgresLiveryCacheRepository;
pub use postgres::playfab_account::PostgresPlayfabAccountRepository;
pub use postgres::settings::PostgresSettingsRepository;
