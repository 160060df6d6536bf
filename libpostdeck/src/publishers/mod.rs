//! Publisher abstraction and implementations
//!
//! A publisher is the external sink a post is handed to once it has been
//! approved. From the lifecycle manager's point of view it is one opaque
//! operation, [`Publisher::send`], that always answers with a structured
//! [`Outcome`]. Transport failures, rejected payloads and missing
//! credentials all come back as [`Outcome::Failed`] rather than as errors.
//!
//! # Examples
//!
//! ```no_run
//! use libpostdeck::publishers::{Publisher, PublishPayload, mock::MockPublisher};
//! use libpostdeck::types::{NewPost, Post};
//!
//! # async fn example() {
//! let publisher = MockPublisher::success("mock");
//! let post = Post::new(1, NewPost::with_body("Hello"));
//! let outcome = publisher.send(&PublishPayload::from_post(&post, false)).await;
//! assert!(!outcome.is_failure());
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PublishError;
use crate::render::render_post;
use crate::types::Post;

pub mod linkedin;
pub mod metricool;

// Mock publisher is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Result of handing a payload to a publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The remote service accepted the post
    Delivered {
        remote_id: Option<String>,
        message: String,
    },
    /// The payload was dropped somewhere for external pickup
    Queued { location: String },
    /// Dry run: checked and rendered, intentionally not transmitted
    Validated { message: String },
    /// The hand-off did not happen
    Failed { message: String },
}

impl Outcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Outcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Delivered { message, .. }
            | Outcome::Validated { message }
            | Outcome::Failed { message } => message,
            Outcome::Queued { location } => location,
        }
    }
}

/// Everything a publisher needs to transmit one post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishPayload {
    pub post_id: i64,
    /// Output of [`crate::render::render_post`]
    pub text: String,
    pub body: String,
    pub title: Option<String>,
    pub page_name: Option<String>,
    pub page_url: Option<String>,
    pub link_url: Option<String>,
    pub hashtags: Vec<String>,
    pub media_paths: Vec<String>,
    pub alt_texts: Vec<String>,
    pub channels: Vec<String>,
    pub scheduled_for: Option<String>,
    pub dry_run: bool,
}

impl PublishPayload {
    pub fn from_post(post: &Post, dry_run: bool) -> Self {
        Self {
            post_id: post.id,
            text: render_post(post),
            body: post.body.clone(),
            title: post.title.clone(),
            page_name: post.page_name.clone(),
            page_url: post.page_url.clone(),
            link_url: post.link_url.clone(),
            hashtags: post.hashtags.clone(),
            media_paths: post.media_paths.clone(),
            alt_texts: post.alt_texts.clone(),
            channels: post.channels.clone(),
            scheduled_for: post.scheduled_for.clone(),
            dry_run,
        }
    }
}

/// Unified interface to the external services posts are published through
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Lowercase identifier ("metricool", "linkedin", ...)
    fn name(&self) -> &str;

    /// Pre-flight validation used by dry runs; nothing is transmitted
    async fn check(&self, _payload: &PublishPayload) -> Result<(), PublishError> {
        Ok(())
    }

    /// Hand the payload over; never fails with an error
    async fn send(&self, payload: &PublishPayload) -> Outcome;
}

/// Which publisher a publish request goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishTarget {
    Metricool,
    Linkedin,
}

impl PublishTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishTarget::Metricool => "metricool",
            PublishTarget::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metricool" => Ok(PublishTarget::Metricool),
            "linkedin" => Ok(PublishTarget::Linkedin),
            _ => Err(format!(
                "Invalid publish target: '{}'. Valid options: metricool, linkedin",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewPost;

    #[test]
    fn test_payload_carries_rendered_text() {
        let post = Post::new(
            3,
            NewPost {
                link_url: Some("http://x".to_string()),
                hashtags: vec!["#a".to_string(), "#b".to_string()],
                channels: vec!["42".to_string()],
                ..NewPost::with_body("Hello world")
            },
        );

        let payload = PublishPayload::from_post(&post, true);
        assert_eq!(payload.post_id, 3);
        assert_eq!(payload.text, "Hello world\n\nhttp://x\n\n#a #b\n");
        assert_eq!(payload.channels, vec!["42".to_string()]);
        assert!(payload.dry_run);
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let outcome = Outcome::Queued {
            location: "/tmp/outbox/post.json".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "queued");
        assert_eq!(json["location"], "/tmp/outbox/post.json");
    }

    #[test]
    fn test_outcome_message() {
        assert_eq!(Outcome::failed("boom").message(), "boom");
        assert!(Outcome::failed("boom").is_failure());
        let delivered = Outcome::Delivered {
            remote_id: Some("7".to_string()),
            message: "ok".to_string(),
        };
        assert!(!delivered.is_failure());
    }

    #[test]
    fn test_publish_target_from_str() {
        assert_eq!("metricool".parse::<PublishTarget>().unwrap(), PublishTarget::Metricool);
        assert_eq!("LinkedIn".parse::<PublishTarget>().unwrap(), PublishTarget::Linkedin);
        assert!("mastodon".parse::<PublishTarget>().is_err());
    }
}
