// src/tasks/mod.rs

pub mod injection_reconciliation;
pub mod livery_sync;
