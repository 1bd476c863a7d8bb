//! VK adapter (community wall polling).
//!
//! Uses the `wall.get` method of the VK API to look at the newest posts.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use vtr_core::{
    domain::{PostId, RawUpdate},
    errors::Error,
    ports::UpstreamClient,
    Result,
};

const API_BASE: &str = "https://api.vk.com/method";

/// A pinned post always comes first, so ask for one more than we need.
const WALL_PAGE: u32 = 2;

#[derive(Clone, Debug)]
pub struct VkClient {
    token: String,
    group_id: i64,
    api_version: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<WallPage>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct WallPage {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

impl VkClient {
    pub fn new(
        token: impl Into<String>,
        group_id: i64,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("vk http client build failed: {e}")))?;
        Ok(Self {
            token: token.into(),
            group_id: group_id.abs(),
            api_version: api_version.into(),
            http,
        })
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    /// Raw items from the top of the community wall.
    pub async fn wall_get(&self, count: u32) -> Result<Vec<Value>> {
        let owner_id = format!("-{}", self.group_id);
        let count = count.to_string();
        let resp = self
            .http
            .get(format!("{API_BASE}/wall.get"))
            .query(&[
                ("owner_id", owner_id.as_str()),
                ("count", count.as_str()),
                ("access_token", self.token.as_str()),
                ("v", self.api_version.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("vk request error: {}", e.without_url())))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "vk wall.get failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let envelope: Envelope = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("vk json error: {e}")))?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: Envelope) -> Result<Vec<Value>> {
    if let Some(err) = envelope.error {
        return Err(Error::Upstream(format!(
            "vk api error {}: {}",
            err.error_code, err.error_msg
        )));
    }
    envelope
        .response
        .map(|page| page.items)
        .ok_or_else(|| Error::Upstream("vk response has neither `response` nor `error`".to_string()))
}

/// Highest-id item strictly newer than `since`. Pinned or not doesn't matter:
/// an old pinned post loses on id, a freshly pinned one is still new.
fn newest_after(items: Vec<Value>, since: PostId) -> Option<RawUpdate> {
    items
        .into_iter()
        .filter_map(|raw| raw.get("id").and_then(Value::as_i64).map(|id| (PostId(id), raw)))
        .filter(|(id, _)| *id > since)
        .max_by_key(|(id, _)| *id)
        .map(|(id, raw)| RawUpdate { id, raw })
}

#[async_trait]
impl UpstreamClient for VkClient {
    async fn fetch_newest(&self, since: PostId) -> Result<Option<RawUpdate>> {
        let items = self.wall_get(WALL_PAGE).await?;
        tracing::debug!("vk wall returned {} items", items.len());
        Ok(newest_after(items, since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(v: Value) -> Envelope {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn api_error_is_an_upstream_error() {
        let err = unwrap_envelope(envelope(json!({
            "error": { "error_code": 5, "error_msg": "User authorization failed" }
        })))
        .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("vk api error 5: User authorization failed"));
    }

    #[test]
    fn empty_envelope_is_an_error() {
        assert!(unwrap_envelope(envelope(json!({}))).is_err());
    }

    #[test]
    fn items_are_unwrapped() {
        let items = unwrap_envelope(envelope(json!({
            "response": { "count": 2, "items": [{"id": 1}, {"id": 2}] }
        })))
        .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn picks_newest_unseen_past_an_old_pinned_post() {
        let items = vec![
            json!({"id": 10, "is_pinned": 1, "text": "rules"}),
            json!({"id": 57, "text": "fresh"}),
        ];
        let update = newest_after(items, PostId(42)).unwrap();
        assert_eq!(update.id, PostId(57));
        assert_eq!(update.raw["text"], "fresh");
    }

    #[test]
    fn nothing_newer_than_watermark() {
        let items = vec![json!({"id": 10, "is_pinned": 1}), json!({"id": 42})];
        assert!(newest_after(items, PostId(42)).is_none());
        assert!(newest_after(vec![], PostId::NONE).is_none());
    }

    #[test]
    fn client_normalizes_group_id() {
        let client =
            VkClient::new("t", -12345, "5.199", Duration::from_secs(1)).unwrap();
        assert_eq!(client.group_id(), 12345);
    }
}
