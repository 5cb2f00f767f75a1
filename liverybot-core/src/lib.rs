// src/lib.rs

pub mod db;
pub mod repositories;
pub mod platforms;
pub mod services;
pub mod tasks;

pub use db::Database;
pub use liverybot_common::error::Error;
