// src/platforms/playfab/mod.rs

pub mod client;

pub use client::PlayfabClient;

use async_trait::async_trait;
use liverybot_common::models::InjectionOutcome;
use crate::Error;

/// The opaque remote redemption operation. One call grants the livery on
/// the game account behind the credential; the caller bounds it with a
/// timeout and treats a timeout like any other remote failure.
#[async_trait]
pub trait LiveryInjector: Send + Sync {
    async fn inject(
        &self,
        livery_id: &str,
        playfab_token: &str,
    ) -> Result<InjectionOutcome, Error>;
}
