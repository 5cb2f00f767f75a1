// src/platforms/mod.rs

pub mod playfab;

pub use playfab::{LiveryInjector, PlayfabClient};
