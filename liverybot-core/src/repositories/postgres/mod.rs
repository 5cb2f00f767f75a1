// src/repositories/postgres/mod.rs

pub mod ledger;
pub mod user;
pub mod product;
pub mod transaction;
pub mod injection;
pub mod livery_cache;
pub mod playfab_account;
pub mod settings;

pub use ledger::PostgresLedger;
pub use user::PostgresUserRepository;
pub use product::PostgresProductRepository;
pub use transaction::PostgresTransactionRepository;
pub use injection::PostgresInjectionRepository;
pub use livery_cache::PostgresLiveryCacheRepository;
pub use playfab_account::PostgresPlayfabAccountRepository;
pub use settings::PostgresSettingsRepository;
