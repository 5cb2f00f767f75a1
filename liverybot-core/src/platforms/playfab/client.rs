// src/platforms/playfab/client.rs
//
// Livery grants go through PlayFab CloudScript as two sequential calls:
// ExecuteGrantItems returns an ItemInstanceId, which the follow-up
// UploadCustomDataWithItem call attaches the livery data to. A grant
// response without an instance id is a remote failure.

use std::time::{Duration, Instant};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use liverybot_common::models::InjectionOutcome;
use crate::platforms::playfab::LiveryInjector;
use crate::Error;

const DEFAULT_BASE_URL: &str =
    "https://be38c.playfabapi.com/Client/ExecuteCloudScript?sdk=UnitySDK-2.212.250428&engine=6000.1.5f1&platform=Android";
const USER_AGENT: &str =
    "UnityPlayer/6000.1.5f1 (UnityWebRequest/1.0, libcurl/8.10.1-DEV)";
const SDK_VERSION: &str = "UnitySDK-2.212.250428";
const UNITY_VERSION: &str = "6000.1.5f1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct PlayfabClient {
    client: reqwest::Client,
    base_url: String,
}

impl PlayfabClient {
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    async fn cloud_script(&self, token: &str, payload: &Value) -> Result<Value, Error> {
        let resp = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .header("X-ReportErrorAsSuccess", "true")
            .header("X-PlayFabSDK", SDK_VERSION)
            .header("X-Authorization", token)
            .header("X-Unity-Version", UNITY_VERSION)
            .json(payload)
            .send()
            .await
            .map_err(remote_error)?;

        let resp = resp.error_for_status().map_err(remote_error)?;
        let body: Value = resp.json().await.map_err(remote_error)?;
        Ok(body)
    }
}

fn remote_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RemoteTimeout(REQUEST_TIMEOUT.as_millis() as u64)
    } else {
        Error::RemoteFailure(e.to_string())
    }
}

/// Pulls the granted item instance out of whichever shape the CloudScript
/// function returned it in.
fn extract_grant(function_result: &Value, requested_id: &str) -> Option<(String, String)> {
    if let Some(granted) = function_result
        .get("grantedItems")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
    {
        let instance = granted.get("ItemInstanceId")?.as_str()?.to_string();
        let item = granted
            .get("ItemId")
            .and_then(|v| v.as_str())
            .unwrap_or(requested_id)
            .to_string();
        return Some((instance, item));
    }

    if let Some(result) = function_result
        .get("ItemGrantResults")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
    {
        let instance = result.get("ItemInstanceId")?.as_str()?.to_string();
        let item = result
            .get("ItemId")
            .and_then(|v| v.as_str())
            .unwrap_or(requested_id)
            .to_string();
        return Some((instance, item));
    }

    if let Some(instance) = function_result.get("itemInstanceId").and_then(|v| v.as_str()) {
        let item = function_result
            .get("itemId")
            .and_then(|v| v.as_str())
            .unwrap_or(requested_id)
            .to_string();
        return Some((instance.to_string(), item));
    }

    None
}

#[async_trait]
impl LiveryInjector for PlayfabClient {
    async fn inject(
        &self,
        livery_id: &str,
        playfab_token: &str,
    ) -> Result<InjectionOutcome, Error> {
        let started = Instant::now();

        let grant_payload = json!({
            "CustomTags": null,
            "FunctionName": "ExecuteGrantItems",
            "FunctionParameter": { "itemIds": [livery_id] },
            "GeneratePlayStreamEvent": false,
        });

        let grant_response = self.cloud_script(playfab_token, &grant_payload).await?;
        debug!("grant response: {}", grant_response);

        let function_result = grant_response
            .pointer("/data/FunctionResult")
            .cloned()
            .unwrap_or(Value::Null);

        let (item_instance_id, item_id) = extract_grant(&function_result, livery_id)
            .ok_or_else(|| {
                Error::RemoteFailure("missing ItemInstanceId in grant response".to_string())
            })?;

        let upload_payload = json!({
            "CustomTags": null,
            "FunctionName": "UploadCustomDataWithItem",
            "FunctionParameter": {
                "itemInstanceId": item_instance_id,
                "itemId": item_id,
            },
            "GeneratePlayStreamEvent": false,
        });

        self.cloud_script(playfab_token, &upload_payload).await?;

        let execution_time_ms = started.elapsed().as_millis() as i64;
        Ok(InjectionOutcome {
            response_data: json!({
                "itemInstanceId": item_instance_id,
                "itemId": item_id,
            }),
            execution_time_ms,
        })
    }
}
