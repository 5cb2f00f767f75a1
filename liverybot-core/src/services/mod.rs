// src/services/mod.rs

pub mod user_service;
pub mod purchase_service;
pub mod injection_service;

pub use user_service::UserService;
pub use purchase_service::PurchaseService;
pub use injection_service::InjectionService;
