//! Core types for Postdeck

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A unit of social-media content moving through the approval/publish workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub media_paths: Vec<String>,
    #[serde(default)]
    pub alt_texts: Vec<String>,
    /// Metricool channel ids
    #[serde(default)]
    pub channels: Vec<String>,
    /// Stored verbatim; nothing publishes on this schedule automatically
    #[serde(default)]
    pub scheduled_for: Option<String>,
    pub status: PostStatus,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Remote post id or outbox location of the last successful hand-off
    #[serde(default)]
    pub remote_ref: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub published_at: Option<i64>,
}

impl Post {
    /// Build a fresh post from client input
    pub fn new(id: i64, draft: NewPost) -> Self {
        let now = chrono::Utc::now().timestamp();
        let status = if draft.draft {
            PostStatus::Draft
        } else {
            PostStatus::Pending
        };

        Self {
            id,
            title: non_empty(draft.title),
            page_name: non_empty(draft.page_name),
            page_url: non_empty(draft.page_url),
            body: draft.body,
            hashtags: draft.hashtags,
            link_url: non_empty(draft.link_url),
            media_paths: draft.media_paths,
            alt_texts: draft.alt_texts,
            channels: draft.channels,
            scheduled_for: non_empty(draft.scheduled_for),
            status,
            approved: false,
            last_error: None,
            remote_ref: None,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    /// Replace the client-writable fields present in `update`
    pub fn apply_update(&mut self, update: PostUpdate) {
        if let Some(title) = update.title {
            self.title = non_empty(Some(title));
        }
        if let Some(page_name) = update.page_name {
            self.page_name = non_empty(Some(page_name));
        }
        if let Some(page_url) = update.page_url {
            self.page_url = non_empty(Some(page_url));
        }
        if let Some(body) = update.body {
            self.body = body;
        }
        if let Some(hashtags) = update.hashtags {
            self.hashtags = hashtags;
        }
        if let Some(link_url) = update.link_url {
            self.link_url = non_empty(Some(link_url));
        }
        if let Some(media_paths) = update.media_paths {
            self.media_paths = media_paths;
        }
        if let Some(alt_texts) = update.alt_texts {
            self.alt_texts = alt_texts;
        }
        if let Some(channels) = update.channels {
            self.channels = channels;
        }
        if let Some(scheduled_for) = update.scheduled_for {
            self.scheduled_for = non_empty(Some(scheduled_for));
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Lifecycle state of a post
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Queued,
    DryRun,
    Published,
    Failed,
}

impl PostStatus {
    pub const ALL: [PostStatus; 8] = [
        PostStatus::Draft,
        PostStatus::Pending,
        PostStatus::Approved,
        PostStatus::Rejected,
        PostStatus::Queued,
        PostStatus::DryRun,
        PostStatus::Published,
        PostStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Approved => "approved",
            PostStatus::Rejected => "rejected",
            PostStatus::Queued => "queued",
            PostStatus::DryRun => "dry_run",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    /// Exact, case-sensitive match on the wire name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid status '{}'. Valid options: {}",
                    s,
                    PostStatus::ALL.map(|st| st.as_str()).join(", ")
                )
            })
    }
}

/// Client input for creating a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub media_paths: Vec<String>,
    #[serde(default)]
    pub alt_texts: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    /// Stage as `draft` instead of submitting for review
    #[serde(default)]
    pub draft: bool,
}

impl NewPost {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Client input for editing a post; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub page_name: Option<String>,
    pub page_url: Option<String>,
    pub body: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub link_url: Option<String>,
    pub media_paths: Option<Vec<String>>,
    pub alt_texts: Option<Vec<String>>,
    pub channels: Option<Vec<String>>,
    pub scheduled_for: Option<String>,
}
