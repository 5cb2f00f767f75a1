// src/tasks/livery_sync.rs
//
// Refreshes liveries_cache from the upstream catalog feed. The feed is a
// JSON object keyed by car code:
//   { "<car_code>": { "carName": "...", "liveries": [ { "id", "name" } ] } }
// Entries the feed no longer carries keep their rows (historical
// injections reference them) but can be flagged unavailable by an admin.

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use liverybot_common::models::LiveryCacheEntry;
use liverybot_common::traits::repository_traits::LiveryCacheRepository;
use crate::Error;

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// `client` is the process-wide HTTP client; it is reused across sync
/// ticks rather than rebuilt per call.
pub async fn sync_livery_catalog(
    repo: &Arc<dyn LiveryCacheRepository>,
    client: &reqwest::Client,
    feed_url: &str,
) -> Result<usize, Error> {
    let body: Value = client
        .get(feed_url)
        .timeout(FEED_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let count = cache_catalog(repo, &body).await?;
    info!("cached {} liveries from catalog feed", count);
    Ok(count)
}

/// Upserts every well-formed entry of the feed; malformed ones are logged
/// and skipped so a single bad record cannot block the refresh.
pub async fn cache_catalog(
    repo: &Arc<dyn LiveryCacheRepository>,
    feed: &Value,
) -> Result<usize, Error> {
    let cars = match feed.as_object() {
        Some(o) => o,
        None => return Err(Error::Parse("catalog feed is not a JSON object".to_string())),
    };

    let mut count = 0usize;
    for (car_code, car_data) in cars {
        let car_name = car_data
            .get("carName")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown");

        let liveries = car_data
            .get("liveries")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        for livery in liveries {
            let (id, name) = match (
                livery.get("id").and_then(|v| v.as_str()),
                livery.get("name").and_then(|v| v.as_str()),
            ) {
                (Some(id), Some(name)) => (id, name),
                _ => {
                    warn!("skipping malformed livery entry for car {}", car_code);
                    continue;
                }
            };

            let entry = LiveryCacheEntry {
                livery_id: id.to_string(),
                livery_name: name.to_string(),
                car_code: car_code.clone(),
                car_name: car_name.to_string(),
                cost_points: None,
                is_available: true,
                last_updated: Utc::now(),
            };
            repo.upsert(&entry).await?;
            count += 1;
        }
    }

    Ok(count)
}
