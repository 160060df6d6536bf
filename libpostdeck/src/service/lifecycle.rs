//! Post lifecycle manager
//!
//! The only component allowed to change `status`, `approved`, `last_error`
//! and `published_at`. Every operation on one post id runs under that id's
//! async lock, so transitions on the same post are strictly serialized while
//! different posts proceed independently. Publishing holds only the one
//! post's lock and is bounded by the configured timeout.
//!
//! ```text
//!            submit            approve            publish
//!   draft ─────────▶ pending ─────────▶ approved ─────────▶ published | queued | failed
//!                       │                   │    (dry run)
//!                       │ reject            └──────────────▶ dry_run | failed
//!                       ▼
//!                    rejected          failed ── publish (retry) ──▶ published | queued | failed
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use super::events::{EventBus, LifecycleEvent};
use crate::error::{PostdeckError, Result};
use crate::publishers::{Outcome, PublishPayload, Publisher};
use crate::render::render_post;
use crate::store::PostStore;
use crate::types::{NewPost, Post, PostStatus, PostUpdate};

/// Flags for a publish request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Run the publisher's pre-flight check only; nothing is transmitted
    #[serde(default)]
    pub dry_run: bool,
    /// Required to publish a post whose last attempt failed
    #[serde(default)]
    pub retry: bool,
}

/// What a publish attempt did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReport {
    pub post: Post,
    pub publisher: String,
    pub outcome: Outcome,
    pub dry_run: bool,
}

/// One async mutex per post id, present only while someone holds or awaits it
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, id: i64) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.map();
            Arc::clone(locks.entry(id).or_default())
        };
        KeyGuard {
            locks: self,
            id,
            _guard: lock.lock_owned().await,
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Arc<tokio::sync::Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    id: i64,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.map();
        // The map and this guard are the only owners: nobody is waiting
        let idle = locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(&self.id);
        }
    }
}

#[derive(Clone)]
pub struct PostLifecycle {
    store: Arc<dyn PostStore>,
    locks: Arc<KeyedLocks>,
    events: EventBus,
    require_channels: bool,
    publish_timeout: Duration,
}

impl PostLifecycle {
    pub fn new(store: Arc<dyn PostStore>, events: EventBus) -> Self {
        Self {
            store,
            locks: Arc::new(KeyedLocks::default()),
            events,
            require_channels: false,
            publish_timeout: Duration::from_secs(30),
        }
    }

    /// Reject posts without at least one channel
    pub fn require_channels(mut self, required: bool) -> Self {
        self.require_channels = required;
        self
    }

    pub fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        &self.store
    }

    /// Store a new post as `pending` (or `draft` when requested)
    pub async fn create(&self, input: NewPost) -> Result<Post> {
        let mut post = Post::new(0, input);
        self.validate(&post)?;

        // Only spend an id on input that is going to be stored
        post.id = self.store.next_id().await?;
        self.store.put(&post).await?;
        info!("Created post {} ({})", post.id, post.status);
        self.events.emit(LifecycleEvent::Created {
            post_id: post.id,
            status: post.status.to_string(),
        });
        Ok(post)
    }

    pub async fn get(&self, id: i64) -> Result<Post> {
        self.store.get(id).await?.ok_or(PostdeckError::NotFound(id))
    }

    /// Most recent first, optionally restricted to one status
    pub async fn list(&self, status: Option<PostStatus>) -> Result<Vec<Post>> {
        let posts = self.store.list().await?;
        Ok(match status {
            Some(status) => posts.into_iter().filter(|p| p.status == status).collect(),
            None => posts,
        })
    }

    /// Rendered text of a post in any status; changes nothing
    pub async fn preview(&self, id: i64) -> Result<String> {
        Ok(render_post(&self.get(id).await?))
    }

    /// Replace content fields of a `draft` or `pending` post
    pub async fn edit(&self, id: i64, update: PostUpdate) -> Result<Post> {
        let _guard = self.locks.acquire(id).await;
        let mut post = self.get(id).await?;
        if !matches!(post.status, PostStatus::Draft | PostStatus::Pending) {
            return Err(invalid_state(&post, "draft or pending"));
        }

        post.apply_update(update);
        self.validate(&post)?;
        post.touch();

        self.store.put(&post).await?;
        info!("Edited post {}", id);
        self.events.emit(LifecycleEvent::Edited { post_id: id });
        Ok(post)
    }

    pub async fn submit(&self, id: i64) -> Result<Post> {
        self.transition(id, PostStatus::Draft, PostStatus::Pending, |post_id| {
            LifecycleEvent::Submitted { post_id }
        })
        .await
    }

    pub async fn approve(&self, id: i64) -> Result<Post> {
        self.transition(id, PostStatus::Pending, PostStatus::Approved, |post_id| {
            LifecycleEvent::Approved { post_id }
        })
        .await
    }

    pub async fn reject(&self, id: i64) -> Result<Post> {
        self.transition(id, PostStatus::Pending, PostStatus::Rejected, |post_id| {
            LifecycleEvent::Rejected { post_id }
        })
        .await
    }

    /// Fail fast with `NotFound`/`InvalidState` when `publish` would refuse `id`
    ///
    /// Advisory only: `publish` repeats the check under the post's lock.
    pub async fn check_publishable(&self, id: i64, retry: bool) -> Result<()> {
        let post = self.get(id).await?;
        ensure_publishable(&post, retry)
    }

    /// Hand an approved post (or a failed one, with `retry`) to `publisher`
    ///
    /// Ineligible posts fail with `InvalidState` and the publisher is never
    /// called. Once eligible, the attempt always ends in a recorded status
    /// and a [`PublishReport`]; publisher failures and timeouts are not
    /// errors.
    pub async fn publish(
        &self,
        id: i64,
        options: PublishOptions,
        publisher: &dyn Publisher,
    ) -> Result<PublishReport> {
        let _guard = self.locks.acquire(id).await;
        let mut post = self.get(id).await?;

        ensure_publishable(&post, options.retry)?;

        let name = publisher.name().to_string();
        let payload = PublishPayload::from_post(&post, options.dry_run);
        let secs = self.publish_timeout.as_secs_f64();

        let outcome = if options.dry_run {
            match tokio::time::timeout(self.publish_timeout, publisher.check(&payload)).await {
                Ok(Ok(())) => Outcome::Validated {
                    message: format!("Validated for {}; not sent", name),
                },
                Ok(Err(e)) => Outcome::failed(e.to_string()),
                Err(_) => Outcome::failed(format!("{} check timed out after {}s", name, secs)),
            }
        } else {
            match tokio::time::timeout(self.publish_timeout, publisher.send(&payload)).await {
                Ok(outcome) => outcome,
                Err(_) => Outcome::failed(format!("{} publish timed out after {}s", name, secs)),
            }
        };

        let event = record_outcome(&mut post, &outcome, &name);
        post.touch();
        self.store.put(&post).await?;

        match &outcome {
            Outcome::Failed { message } => warn!("Publishing post {} via {} failed: {}", id, name, message),
            _ => info!("Post {} is now {} via {}", id, post.status, name),
        }
        self.events.emit(event);

        Ok(PublishReport {
            post,
            publisher: name,
            outcome,
            dry_run: options.dry_run,
        })
    }

    /// Remove a post for good; unknown ids are `NotFound`
    pub async fn delete(&self, id: i64) -> Result<()> {
        {
            let _guard = self.locks.acquire(id).await;
            if !self.store.delete(id).await? {
                return Err(PostdeckError::NotFound(id));
            }
        }

        info!("Deleted post {}", id);
        self.events.emit(LifecycleEvent::Deleted { post_id: id });
        Ok(())
    }

    async fn transition(
        &self,
        id: i64,
        from: PostStatus,
        to: PostStatus,
        event: impl FnOnce(i64) -> LifecycleEvent,
    ) -> Result<Post> {
        let _guard = self.locks.acquire(id).await;
        let mut post = self.get(id).await?;
        if post.status != from {
            return Err(invalid_state(&post, from.as_str()));
        }

        post.status = to;
        if to == PostStatus::Approved {
            post.approved = true;
        }
        post.touch();

        self.store.put(&post).await?;
        info!("Post {} moved {} -> {}", id, from, to);
        self.events.emit(event(id));
        Ok(post)
    }

    fn validate(&self, post: &Post) -> Result<()> {
        if post.body.trim().is_empty() {
            return Err(PostdeckError::Validation("Post body cannot be empty".to_string()));
        }
        if post.hashtags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(PostdeckError::Validation("Hashtags cannot be empty".to_string()));
        }
        if !post.alt_texts.is_empty() && post.alt_texts.len() != post.media_paths.len() {
            return Err(PostdeckError::Validation(format!(
                "Got {} alt texts for {} media paths; provide one per media item or none",
                post.alt_texts.len(),
                post.media_paths.len()
            )));
        }
        if self.require_channels && post.channels.is_empty() {
            return Err(PostdeckError::Validation(
                "At least one channel is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn ensure_publishable(post: &Post, retry: bool) -> Result<()> {
    match post.status {
        PostStatus::Approved => Ok(()),
        PostStatus::Failed if retry => Ok(()),
        PostStatus::Failed => Err(invalid_state(post, "approved (or failed with retry)")),
        _ => Err(invalid_state(post, "approved")),
    }
}

fn invalid_state(post: &Post, required: &str) -> PostdeckError {
    PostdeckError::InvalidState {
        id: post.id,
        actual: post.status,
        required: required.to_string(),
    }
}

/// Apply a publish outcome to the post and describe it as an event
fn record_outcome(post: &mut Post, outcome: &Outcome, publisher: &str) -> LifecycleEvent {
    let publisher = publisher.to_string();
    match outcome {
        Outcome::Delivered { remote_id, .. } => {
            post.status = PostStatus::Published;
            post.last_error = None;
            post.remote_ref = remote_id.clone();
            if post.published_at.is_none() {
                post.published_at = Some(chrono::Utc::now().timestamp());
            }
            LifecycleEvent::Published {
                post_id: post.id,
                publisher,
                remote_id: remote_id.clone(),
            }
        }
        Outcome::Queued { location } => {
            post.status = PostStatus::Queued;
            post.last_error = None;
            post.remote_ref = Some(location.clone());
            LifecycleEvent::Queued {
                post_id: post.id,
                publisher,
                location: location.clone(),
            }
        }
        Outcome::Validated { .. } => {
            post.status = PostStatus::DryRun;
            post.last_error = None;
            LifecycleEvent::DryRun {
                post_id: post.id,
                publisher,
            }
        }
        Outcome::Failed { message } => {
            post.status = PostStatus::Failed;
            post.last_error = Some(message.clone());
            LifecycleEvent::PublishFailed {
                post_id: post.id,
                publisher,
                error: message.clone(),
            }
        }
    }
}
