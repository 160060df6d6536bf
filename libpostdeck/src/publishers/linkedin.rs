//! LinkedIn publisher
//!
//! Nothing here talks to LinkedIn directly. A post is turned into a skill
//! config document, checked by a [`Validator`], and dropped into a
//! [`QueueSink`] (normally an outbox directory) for an external poster to
//! pick up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Outcome, PublishPayload, Publisher};
use crate::error::PublishError;
use crate::render::render_text;

/// Config document consumed by the LinkedIn auto-poster
///
/// Empty optional values are omitted entirely; list fields are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    pub post_text: String,
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    pub media_paths: Vec<String>,
    pub alt_texts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub dry_run: bool,
}

impl SkillConfig {
    pub fn from_payload(payload: &PublishPayload) -> Self {
        fn present(value: &Option<String>) -> Option<String> {
            value.clone().filter(|v| !v.is_empty())
        }

        Self {
            page_name: present(&payload.page_name),
            page_url: present(&payload.page_url),
            post_text: payload.body.clone(),
            hashtags: payload.hashtags.clone(),
            link_url: present(&payload.link_url),
            media_paths: payload.media_paths.clone(),
            alt_texts: payload.alt_texts.clone(),
            schedule: present(&payload.scheduled_for),
            dry_run: payload.dry_run,
        }
    }

    /// Text as it will appear on LinkedIn
    pub fn rendered_text(&self) -> String {
        render_text(&self.post_text, self.link_url.as_deref(), &self.hashtags)
    }
}

/// Decides whether a skill config is acceptable to the auto-poster
pub trait Validator: Send + Sync {
    fn validate(&self, config: &SkillConfig) -> Result<(), String>;
}

/// Built-in rule set mirroring LinkedIn's posting limits
#[derive(Debug, Clone)]
pub struct RuleValidator {
    pub max_chars: usize,
    pub max_media: usize,
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self {
            max_chars: 3000,
            max_media: 9,
        }
    }
}

impl RuleValidator {
    pub fn new(max_chars: usize, max_media: usize) -> Self {
        Self {
            max_chars,
            max_media,
        }
    }
}

fn check_http_url(field: &str, value: Option<&str>) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    match reqwest::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(format!(
            "{} must be an http(s) URL, got scheme '{}'",
            field,
            url.scheme()
        )),
        Err(e) => Err(format!("{} is not a valid URL: {}", field, e)),
    }
}

impl Validator for RuleValidator {
    fn validate(&self, config: &SkillConfig) -> Result<(), String> {
        if config.post_text.trim().is_empty() {
            return Err("post_text cannot be empty".to_string());
        }

        let length = config.rendered_text().chars().count();
        if length > self.max_chars {
            return Err(format!(
                "post is {} characters; LinkedIn allows {}",
                length, self.max_chars
            ));
        }

        if config.media_paths.len() > self.max_media {
            return Err(format!(
                "{} media attachments; at most {} allowed",
                config.media_paths.len(),
                self.max_media
            ));
        }

        if config.alt_texts.len() > config.media_paths.len() {
            return Err(format!(
                "{} alt texts for {} media attachments",
                config.alt_texts.len(),
                config.media_paths.len()
            ));
        }

        check_http_url("page_url", config.page_url.as_deref())?;
        check_http_url("link_url", config.link_url.as_deref())?;

        Ok(())
    }
}

/// Destination for validated skill configs
#[async_trait]
pub trait QueueSink: Send + Sync {
    /// Store the config and return where it went
    async fn enqueue(&self, post_id: i64, config: &SkillConfig) -> Result<String, PublishError>;
}

/// Writes each config as pretty JSON into a directory
pub struct OutboxSink {
    dir: PathBuf,
}

impl OutboxSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(post_id: i64) -> String {
        format!(
            "post_{}_{}.json",
            chrono::Utc::now().format("%Y%m%dT%H%M%SZ"),
            post_id
        )
    }
}

#[async_trait]
impl QueueSink for OutboxSink {
    async fn enqueue(&self, post_id: i64, config: &SkillConfig) -> Result<String, PublishError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            PublishError::NotConfigured(format!(
                "cannot create outbox {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.dir.join(Self::file_name(post_id));
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| PublishError::Rejected(format!("unserializable config: {}", e)))?;

        tokio::fs::write(&path, content).await.map_err(|e| {
            PublishError::NotConfigured(format!("cannot write {}: {}", path.display(), e))
        })?;

        debug!("Wrote outbox file {}", path.display());
        Ok(path.display().to_string())
    }
}

/// Validates and queues posts for the LinkedIn auto-poster
pub struct LinkedInPublisher {
    validator: Arc<dyn Validator>,
    sink: Arc<dyn QueueSink>,
}

impl LinkedInPublisher {
    pub fn new(validator: Arc<dyn Validator>, sink: Arc<dyn QueueSink>) -> Self {
        Self { validator, sink }
    }

    /// Rule validator plus outbox directory
    pub fn with_outbox(dir: impl Into<PathBuf>, max_chars: usize, max_media: usize) -> Self {
        Self::new(
            Arc::new(RuleValidator::new(max_chars, max_media)),
            Arc::new(OutboxSink::new(dir)),
        )
    }
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    fn name(&self) -> &str {
        "linkedin"
    }

    async fn check(&self, payload: &PublishPayload) -> Result<(), PublishError> {
        self.validator
            .validate(&SkillConfig::from_payload(payload))
            .map_err(PublishError::Rejected)
    }

    async fn send(&self, payload: &PublishPayload) -> Outcome {
        let config = SkillConfig::from_payload(payload);
        if let Err(reason) = self.validator.validate(&config) {
            return Outcome::failed(PublishError::Rejected(reason).to_string());
        }

        match self.sink.enqueue(payload.post_id, &config).await {
            Ok(location) => {
                info!("Queued post {} for LinkedIn at {}", payload.post_id, location);
                Outcome::Queued { location }
            }
            Err(e) => Outcome::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewPost, Post};
    use tempfile::TempDir;

    fn payload(input: NewPost) -> PublishPayload {
        PublishPayload::from_post(&Post::new(7, input), false)
    }

    #[test]
    fn test_skill_config_omits_empty_values() {
        let config = SkillConfig::from_payload(&payload(NewPost::with_body("Hi")));
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["post_text"], "Hi");
        assert_eq!(json["hashtags"], serde_json::json!([]));
        assert_eq!(json["dry_run"], false);
        assert!(json.get("page_name").is_none());
        assert!(json.get("link_url").is_none());
        assert!(json.get("schedule").is_none());
    }

    #[test]
    fn test_skill_config_carries_schedule_and_page() {
        let config = SkillConfig::from_payload(&payload(NewPost {
            page_name: Some("Acme".to_string()),
            page_url: Some("https://linkedin.com/company/acme".to_string()),
            scheduled_for: Some("2026-11-01T09:00".to_string()),
            ..NewPost::with_body("Hi")
        }));
        assert_eq!(config.page_name.as_deref(), Some("Acme"));
        assert_eq!(config.schedule.as_deref(), Some("2026-11-01T09:00"));
    }

    #[test]
    fn test_rule_validator_accepts_reasonable_post() {
        let config = SkillConfig::from_payload(&payload(NewPost {
            link_url: Some("https://example.com".to_string()),
            media_paths: vec!["/img/a.png".to_string()],
            alt_texts: vec!["A chart".to_string()],
            ..NewPost::with_body("Quarterly numbers")
        }));
        assert!(RuleValidator::default().validate(&config).is_ok());
    }

    #[test]
    fn test_rule_validator_rejects_blank_text() {
        let config = SkillConfig::from_payload(&payload(NewPost::with_body("   ")));
        let err = RuleValidator::default().validate(&config).unwrap_err();
        assert!(err.contains("post_text"));
    }

    #[test]
    fn test_rule_validator_counts_rendered_characters() {
        let config = SkillConfig::from_payload(&payload(NewPost {
            hashtags: vec!["#abc".to_string()],
            ..NewPost::with_body("x".repeat(10))
        }));
        // "xxxxxxxxxx\n\n#abc\n" is 17 characters
        assert!(RuleValidator::new(17, 9).validate(&config).is_ok());
        assert!(RuleValidator::new(16, 9).validate(&config).is_err());
    }

    #[test]
    fn test_rule_validator_media_limits() {
        let too_many = SkillConfig::from_payload(&payload(NewPost {
            media_paths: (0..3).map(|i| format!("/img/{}.png", i)).collect(),
            ..NewPost::with_body("Gallery")
        }));
        assert!(RuleValidator::new(3000, 2).validate(&too_many).is_err());

        let extra_alt = SkillConfig::from_payload(&payload(NewPost {
            media_paths: vec!["/img/a.png".to_string()],
            alt_texts: vec!["one".to_string(), "two".to_string()],
            ..NewPost::with_body("Gallery")
        }));
        let err = RuleValidator::default().validate(&extra_alt).unwrap_err();
        assert!(err.contains("2 alt texts for 1 media"));
    }

    #[test]
    fn test_rule_validator_rejects_non_http_urls() {
        let config = SkillConfig::from_payload(&payload(NewPost {
            link_url: Some("ftp://example.com/file".to_string()),
            ..NewPost::with_body("Link")
        }));
        let err = RuleValidator::default().validate(&config).unwrap_err();
        assert!(err.contains("link_url"));

        let config = SkillConfig::from_payload(&payload(NewPost {
            page_url: Some("not a url".to_string()),
            ..NewPost::with_body("Link")
        }));
        assert!(RuleValidator::default().validate(&config).is_err());
    }

    #[test]
    fn test_outbox_file_name_format() {
        let name = OutboxSink::file_name(12);
        assert!(name.starts_with("post_"));
        assert!(name.ends_with("Z_12.json"));
        // post_ + 16-char timestamp + _12.json
        assert_eq!(name.len(), "post_".len() + 16 + "_12.json".len());
    }

    #[tokio::test]
    async fn test_send_writes_outbox_file() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let publisher = LinkedInPublisher::with_outbox(&outbox, 3000, 9);

        let outcome = publisher
            .send(&payload(NewPost {
                hashtags: vec!["#rust".to_string()],
                ..NewPost::with_body("Shipping")
            }))
            .await;

        let Outcome::Queued { location } = outcome else {
            panic!("expected queued outcome, got {:?}", outcome);
        };
        assert!(location.ends_with("_7.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&location).unwrap()).unwrap();
        assert_eq!(written["post_text"], "Shipping");
        assert_eq!(written["hashtags"], serde_json::json!(["#rust"]));
    }

    #[tokio::test]
    async fn test_send_rejected_post_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let publisher = LinkedInPublisher::with_outbox(&outbox, 5, 9);

        let outcome = publisher.send(&payload(NewPost::with_body("far too long"))).await;
        assert!(outcome.is_failure());
        assert!(outcome.message().starts_with("Rejected by validator"));
        assert!(!outbox.exists());
    }

    #[tokio::test]
    async fn test_check_does_not_touch_sink() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let publisher = LinkedInPublisher::with_outbox(&outbox, 3000, 9);

        assert!(publisher.check(&payload(NewPost::with_body("ok"))).await.is_ok());
        assert!(matches!(
            publisher.check(&payload(NewPost::with_body(""))).await,
            Err(PublishError::Rejected(_))
        ));
        assert!(!outbox.exists());
    }
}
