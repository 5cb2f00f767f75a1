// src/tasks/injection_reconciliation.rs
//
// Recovery for the one gap a single database transaction cannot cover:
// a debit that committed while the dispatch outcome was lost (crash or
// missed settlement). Such attempts sit in `pending` past the dispatch
// timeout and are refunded here.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::services::InjectionService;
use crate::Error;

/// One sweep. Called on startup and then periodically.
pub async fn run_injection_reconciliation(service: &InjectionService) -> Result<(), Error> {
    let settled = service.reconcile_stale_pending().await?;
    if settled > 0 {
        info!("reconciliation sweep settled {} stale injection(s)", settled);
    }
    Ok(())
}

pub fn spawn_reconciliation_loop(
    service: Arc<InjectionService>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = run_injection_reconciliation(&service).await {
                error!("injection reconciliation sweep failed: {:?}", e);
            }
        }
    })
}
