//! Metricool publisher
//!
//! Posts are created through `POST {base}/workspaces/{workspace}/posts`,
//! authenticated with the `X-Mc-Auth` header. The client also proxies the
//! read-only workspace and channel listings the dashboard needs to pick
//! destinations.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Outcome, PublishPayload, Publisher};
use crate::error::PublishError;

const AUTH_HEADER: &str = "X-Mc-Auth";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub network: String,
}

/// Request body for creating a Metricool post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricoolPost {
    pub content: String,
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRef {
    pub url: String,
}

impl MetricoolPost {
    pub fn from_payload(payload: &PublishPayload) -> Self {
        Self {
            content: payload.text.clone(),
            channels: payload.channels.clone(),
            scheduled_time: payload.scheduled_for.clone(),
            media: payload
                .media_paths
                .iter()
                .map(|url| MediaRef { url: url.clone() })
                .collect(),
        }
    }
}

/// Thin HTTP client for the Metricool API
pub struct MetricoolClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl MetricoolClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str, PublishError> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| {
                PublishError::Authentication("Metricool API key is not configured".to_string())
            })
    }

    /// List workspaces (brands) visible to the API key
    pub async fn workspaces(&self) -> Result<Vec<Workspace>, PublishError> {
        let json = self.get_json("/workspaces").await?;
        Ok(data_items(&json)
            .iter()
            .map(|item| Workspace {
                id: string_field(item, "id"),
                name: string_field(item, "name"),
            })
            .collect())
    }

    /// List social channels connected to a workspace
    pub async fn channels(&self, workspace_id: &str) -> Result<Vec<Channel>, PublishError> {
        let json = self
            .get_json(&format!("/workspaces/{}/channels", workspace_id))
            .await?;
        Ok(data_items(&json)
            .iter()
            .map(|item| Channel {
                id: string_field(item, "id"),
                name: string_field(item, "name"),
                network: string_field(item, "network"),
            })
            .collect())
    }

    /// Create (and optionally schedule) a post; returns the response document
    pub async fn create_post(
        &self,
        workspace_id: &str,
        post: &MetricoolPost,
    ) -> Result<Value, PublishError> {
        let url = format!("{}/workspaces/{}/posts", self.base_url, workspace_id);
        debug!("Creating Metricool post in workspace {}", workspace_id);

        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, self.api_key()?)
            .json(post)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, PublishError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(AUTH_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response).await
    }
}

fn network_error(error: reqwest::Error) -> PublishError {
    if error.is_timeout() {
        PublishError::Network(format!("Metricool request timed out: {}", error))
    } else {
        PublishError::Network(format!("Metricool request failed: {}", error))
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, PublishError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PublishError::Authentication(format!(
            "Metricool rejected the API key ({})",
            status
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PublishError::Remote {
            status: status.as_u16(),
            body,
        });
    }

    // Some endpoints answer 2xx with an empty body
    let text = response.text().await.map_err(network_error)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| PublishError::Network(format!("Invalid JSON from Metricool: {}", e)))
}

fn data_items(json: &Value) -> Vec<Value> {
    json.get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Read a field that Metricool may send as either a string or a number
fn string_field(item: &Value, field: &str) -> String {
    match item.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn remote_id(json: &Value) -> Option<String> {
    [json.get("data").unwrap_or(&Value::Null), json]
        .iter()
        .map(|v| string_field(v, "id"))
        .find(|id| !id.is_empty())
}

/// Publishes through a Metricool workspace
pub struct MetricoolPublisher {
    client: MetricoolClient,
    workspace_id: Option<String>,
}

impl MetricoolPublisher {
    pub fn new(client: MetricoolClient, workspace_id: Option<String>) -> Self {
        Self {
            client,
            workspace_id: workspace_id.filter(|w| !w.is_empty()),
        }
    }

    fn preflight(&self, payload: &PublishPayload) -> Result<&str, PublishError> {
        self.client.api_key()?;
        let workspace = self.workspace_id.as_deref().ok_or_else(|| {
            PublishError::NotConfigured("no Metricool workspace selected".to_string())
        })?;
        if payload.channels.is_empty() {
            return Err(PublishError::Rejected(
                "post has no Metricool channels".to_string(),
            ));
        }
        Ok(workspace)
    }
}

#[async_trait]
impl Publisher for MetricoolPublisher {
    fn name(&self) -> &str {
        "metricool"
    }

    async fn check(&self, payload: &PublishPayload) -> Result<(), PublishError> {
        self.preflight(payload).map(|_| ())
    }

    async fn send(&self, payload: &PublishPayload) -> Outcome {
        let workspace = match self.preflight(payload) {
            Ok(workspace) => workspace,
            Err(e) => return Outcome::failed(e.to_string()),
        };

        let body = MetricoolPost::from_payload(payload);
        match self.client.create_post(workspace, &body).await {
            Ok(json) => Outcome::Delivered {
                remote_id: remote_id(&json),
                message: format!("Published via Metricool workspace {}", workspace),
            },
            Err(e) => {
                warn!("Metricool publish of post {} failed: {}", payload.post_id, e);
                Outcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewPost, Post};
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    const KEY: &str = "test-key";

    /// Fake Metricool API on an ephemeral port; records create-post bodies
    async fn spawn_fake_metricool(received: Arc<Mutex<Vec<Value>>>) -> String {
        fn authorized(headers: &HeaderMap) -> bool {
            headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) == Some(KEY)
        }

        let app = Router::new()
            .route(
                "/workspaces",
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return (axum::http::StatusCode::UNAUTHORIZED, Json(Value::Null));
                    }
                    (
                        axum::http::StatusCode::OK,
                        Json(serde_json::json!({ "data": [{ "id": 11, "name": "Brand" }] })),
                    )
                }),
            )
            .route(
                "/workspaces/{id}/channels",
                get(|Path(id): Path<String>| async move {
                    Json(serde_json::json!({
                        "data": [{ "id": format!("{}-li", id), "name": "Page", "network": "linkedin" }]
                    }))
                }),
            )
            .route(
                "/workspaces/{id}/posts",
                post(move |Path(id): Path<String>, Json(body): Json<Value>| {
                    let received = received.clone();
                    async move {
                        received.lock().unwrap().push(body);
                        if id == "broken" {
                            return (
                                axum::http::StatusCode::BAD_GATEWAY,
                                Json(serde_json::json!({ "error": "upstream" })),
                            );
                        }
                        (
                            axum::http::StatusCode::OK,
                            Json(serde_json::json!({ "data": { "id": 987 } })),
                        )
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str, key: Option<&str>) -> MetricoolClient {
        MetricoolClient::new(
            base_url,
            key.map(|k| SecretString::from(k.to_string())),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn payload(channels: &[&str]) -> PublishPayload {
        let post = Post::new(
            1,
            NewPost {
                hashtags: vec!["#a".to_string()],
                media_paths: vec!["https://cdn.example/img.png".to_string()],
                channels: channels.iter().map(|c| c.to_string()).collect(),
                scheduled_for: Some("2026-11-01T09:00:00Z".to_string()),
                ..NewPost::with_body("Launch day")
            },
        );
        PublishPayload::from_post(&post, false)
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(MetricoolPost::from_payload(&payload(&["c1"]))).unwrap();
        assert_eq!(body["content"], "Launch day\n\n#a\n");
        assert_eq!(body["channels"], serde_json::json!(["c1"]));
        assert_eq!(body["scheduled_time"], "2026-11-01T09:00:00Z");
        assert_eq!(body["media"], serde_json::json!([{ "url": "https://cdn.example/img.png" }]));
    }

    #[test]
    fn test_request_body_omits_empty_optionals() {
        let post = Post::new(1, NewPost::with_body("Plain"));
        let body =
            serde_json::to_value(MetricoolPost::from_payload(&PublishPayload::from_post(&post, false)))
                .unwrap();
        assert!(body.get("scheduled_time").is_none());
        assert!(body.get("media").is_none());
    }

    #[test]
    fn test_remote_id_extraction() {
        assert_eq!(remote_id(&serde_json::json!({ "data": { "id": 5 } })), Some("5".to_string()));
        assert_eq!(remote_id(&serde_json::json!({ "id": "abc" })), Some("abc".to_string()));
        assert_eq!(remote_id(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_send_delivers_and_records_body() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_fake_metricool(received.clone()).await;
        let publisher = MetricoolPublisher::new(client(&base, Some(KEY)), Some("ws1".to_string()));

        let outcome = publisher.send(&payload(&["c1", "c2"])).await;
        assert_eq!(
            outcome,
            Outcome::Delivered {
                remote_id: Some("987".to_string()),
                message: "Published via Metricool workspace ws1".to_string(),
            }
        );

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["channels"], serde_json::json!(["c1", "c2"]));
    }

    #[tokio::test]
    async fn test_send_remote_error_becomes_failed_outcome() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_fake_metricool(received).await;
        let publisher =
            MetricoolPublisher::new(client(&base, Some(KEY)), Some("broken".to_string()));

        let outcome = publisher.send(&payload(&["c1"])).await;
        assert!(outcome.is_failure());
        assert!(outcome.message().contains("502"));
    }

    #[tokio::test]
    async fn test_send_without_key_fails_without_request() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let base = spawn_fake_metricool(received.clone()).await;
        let publisher = MetricoolPublisher::new(client(&base, None), Some("ws1".to_string()));

        let outcome = publisher.send(&payload(&["c1"])).await;
        assert!(outcome.message().contains("API key is not configured"));
        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_requires_workspace_and_channels() {
        let publisher = MetricoolPublisher::new(client("http://127.0.0.1:9", Some(KEY)), None);
        assert!(matches!(
            publisher.check(&payload(&["c1"])).await,
            Err(PublishError::NotConfigured(_))
        ));

        let publisher =
            MetricoolPublisher::new(client("http://127.0.0.1:9", Some(KEY)), Some("ws".to_string()));
        assert!(matches!(
            publisher.check(&payload(&[])).await,
            Err(PublishError::Rejected(_))
        ));
        assert!(publisher.check(&payload(&["c1"])).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_failed_outcome() {
        let publisher =
            MetricoolPublisher::new(client("http://127.0.0.1:9", Some(KEY)), Some("ws".to_string()));
        let outcome = publisher.send(&payload(&["c1"])).await;
        assert!(outcome.is_failure());
        assert!(outcome.message().contains("Network error"));
    }

    #[tokio::test]
    async fn test_workspace_and_channel_listing() {
        let base = spawn_fake_metricool(Arc::new(Mutex::new(Vec::new()))).await;
        let client = client(&base, Some(KEY));

        let workspaces = client.workspaces().await.unwrap();
        assert_eq!(
            workspaces,
            vec![Workspace {
                id: "11".to_string(),
                name: "Brand".to_string()
            }]
        );

        let channels = client.channels("11").await.unwrap();
        assert_eq!(channels[0].id, "11-li");
        assert_eq!(channels[0].network, "linkedin");
    }

    #[tokio::test]
    async fn test_listing_with_bad_key_is_authentication_error() {
        let base = spawn_fake_metricool(Arc::new(Mutex::new(Vec::new()))).await;
        let result = client(&base, Some("wrong")).workspaces().await;
        assert!(matches!(result, Err(PublishError::Authentication(_))));
    }
}
