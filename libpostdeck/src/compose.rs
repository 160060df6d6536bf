//! AI-assisted drafting
//!
//! Asks an OpenAI-compatible chat completion endpoint for a post about a
//! topic and splits the reply into a body and hashtags. The composer never
//! stores anything; callers feed the result into `create`.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ComposeConfig;
use crate::error::{PostdeckError, Result};

const SYSTEM_PROMPT: &str = "You write LinkedIn posts for a company page. \
Reply with the post text only: no preamble, no markdown headings, no quotes. \
Keep it under 1300 characters. End with one line of 3 to 5 relevant hashtags.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub topic: String,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedPost {
    pub body: String,
    pub hashtags: Vec<String>,
}

pub struct Composer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl Composer {
    pub fn new(config: &ComposeConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PostdeckError::Compose(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub async fn draft(&self, request: &ComposeRequest) -> Result<ComposedPost> {
        if request.topic.trim().is_empty() {
            return Err(PostdeckError::Validation("topic cannot be empty".to_string()));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(request) },
            ],
            "temperature": 0.7,
            "max_tokens": 700,
        });

        tracing::debug!("Requesting draft from {} ({})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| PostdeckError::Compose(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostdeckError::Compose(format!(
                "model endpoint returned {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PostdeckError::Compose(format!("invalid response: {}", e)))?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();

        parse_composed(content)
    }
}

fn build_user_prompt(request: &ComposeRequest) -> String {
    match request.tone.as_deref().map(str::trim) {
        Some(tone) if !tone.is_empty() => {
            format!("Topic: {}\nTone: {}", request.topic.trim(), tone)
        }
        _ => format!("Topic: {}", request.topic.trim()),
    }
}

fn is_tag_line(line: &str) -> bool {
    let mut tokens = line.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| t.len() > 1 && t.starts_with('#'))
}

/// Split a model reply into body and trailing hashtag lines
pub fn parse_composed(reply: &str) -> Result<ComposedPost> {
    let mut lines: Vec<&str> = reply.trim().lines().collect();

    let mut tag_lines = Vec::new();
    while let Some(last) = lines.last() {
        if is_tag_line(last) {
            tag_lines.push(*last);
            lines.pop();
        } else {
            break;
        }
    }

    let body = lines.join("\n").trim().to_string();
    if body.is_empty() {
        return Err(PostdeckError::Compose(
            "model reply contained no post body".to_string(),
        ));
    }

    let mut hashtags: Vec<String> = Vec::new();
    for tag in tag_lines.iter().rev().flat_map(|l| l.split_whitespace()) {
        if !hashtags.iter().any(|t| t == tag) {
            hashtags.push(tag.to_string());
        }
    }

    Ok(ComposedPost { body, hashtags })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{http::HeaderMap, Json, Router};

    #[test]
    fn test_parse_splits_trailing_hashtags() {
        let parsed = parse_composed("We shipped v2!\n\nFaster builds.\n\n#rust #release\n#devtools").unwrap();
        assert_eq!(parsed.body, "We shipped v2!\n\nFaster builds.");
        assert_eq!(parsed.hashtags, vec!["#rust", "#release", "#devtools"]);
    }

    #[test]
    fn test_parse_without_hashtags() {
        let parsed = parse_composed("  Just a body.  ").unwrap();
        assert_eq!(parsed.body, "Just a body.");
        assert!(parsed.hashtags.is_empty());
    }

    #[test]
    fn test_parse_keeps_inline_hashtags_in_body() {
        let parsed = parse_composed("Loving #rust today\n#rust #tips").unwrap();
        assert_eq!(parsed.body, "Loving #rust today");
        assert_eq!(parsed.hashtags, vec!["#rust", "#tips"]);
    }

    #[test]
    fn test_parse_dedupes_hashtags() {
        let parsed = parse_composed("Body\n#a #b\n#a").unwrap();
        assert_eq!(parsed.hashtags, vec!["#a", "#b"]);
    }

    #[test]
    fn test_parse_rejects_tags_only_reply() {
        assert!(matches!(parse_composed("#a #b"), Err(PostdeckError::Compose(_))));
        assert!(matches!(parse_composed(""), Err(PostdeckError::Compose(_))));
    }

    #[test]
    fn test_user_prompt_includes_tone() {
        let request = ComposeRequest {
            topic: " hiring ".to_string(),
            tone: Some("playful".to_string()),
        };
        assert_eq!(build_user_prompt(&request), "Topic: hiring\nTone: playful");

        let request = ComposeRequest {
            topic: "hiring".to_string(),
            tone: Some("  ".to_string()),
        };
        assert_eq!(build_user_prompt(&request), "Topic: hiring");
    }

    async fn spawn_fake_model(reply: &'static str) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer test-key");
                if !authorized || body["model"] != "test-model" {
                    return (axum::http::StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
                }
                (
                    axum::http::StatusCode::OK,
                    Json(serde_json::json!({
                        "choices": [{ "message": { "role": "assistant", "content": reply } }]
                    })),
                )
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn config(endpoint: String) -> ComposeConfig {
        ComposeConfig {
            endpoint,
            model: "test-model".to_string(),
            api_key_name: "compose".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_draft_against_fake_endpoint() {
        let endpoint = spawn_fake_model("Big news.\n#launch").await;
        let composer =
            Composer::new(&config(endpoint), SecretString::from("test-key".to_string())).unwrap();

        let composed = composer
            .draft(&ComposeRequest {
                topic: "launch".to_string(),
                tone: None,
            })
            .await
            .unwrap();
        assert_eq!(composed.body, "Big news.");
        assert_eq!(composed.hashtags, vec!["#launch"]);
    }

    #[tokio::test]
    async fn test_draft_surfaces_http_errors() {
        let endpoint = spawn_fake_model("unused").await;
        let composer =
            Composer::new(&config(endpoint), SecretString::from("wrong".to_string())).unwrap();

        let err = composer
            .draft(&ComposeRequest {
                topic: "launch".to_string(),
                tone: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_draft_requires_topic() {
        let composer = Composer::new(
            &config("http://127.0.0.1:9/v1/chat/completions".to_string()),
            SecretString::from("k".to_string()),
        )
        .unwrap();
        let err = composer.draft(&ComposeRequest::default()).await.unwrap_err();
        assert!(matches!(err, PostdeckError::Validation(_)));
    }
}
