// File: liverybot-common/src/models/mod.rs
pub mod user;
pub mod product;
pub mod transaction;
pub mod livery;
pub mod injection;
pub mod playfab;
pub mod setting;

pub use user::User;
pub use product::Product;
pub use transaction::{Transaction, TransactionStatus};
pub use livery::{CarLiveries, LiveryCacheEntry};
pub use injection::{Injection, InjectionOutcome, InjectionStatus};
pub use playfab::PlayfabAccount;
pub use setting::Setting;
