//! Service layer for Postdeck
//!
//! `PostdeckService` is the single entry point the CLI and the HTTP server
//! share. It owns the store, the credential manager and the event bus, hands
//! out the [`PostLifecycle`] manager, and turns a [`PublishTarget`] into a
//! concrete publisher built from configuration and stored keys.
//!
//! # Example
//!
//! ```no_run
//! use libpostdeck::service::{PostdeckService, PublishRequest};
//! use libpostdeck::types::NewPost;
//!
//! # async fn example() -> libpostdeck::Result<()> {
//! let service = PostdeckService::new().await?;
//!
//! let post = service.lifecycle().create(NewPost::with_body("Hello")).await?;
//! service.lifecycle().approve(post.id).await?;
//!
//! let report = service
//!     .publish(post.id, PublishRequest { dry_run: true, ..Default::default() })
//!     .await?;
//! println!("{} -> {}", post.id, report.post.status);
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod lifecycle;

pub use events::{EventBus, EventReceiver, LifecycleEvent};
pub use lifecycle::{PostLifecycle, PublishOptions, PublishReport};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::compose::{ComposeRequest, ComposedPost, Composer};
use crate::config::{expand_path, Config};
use crate::credentials::CredentialManager;
use crate::error::{ConfigError, PostdeckError, Result};
use crate::publishers::linkedin::LinkedInPublisher;
use crate::publishers::metricool::{Channel, MetricoolClient, MetricoolPublisher, Workspace};
use crate::publishers::{PublishTarget, Publisher};
use crate::store::{open_store, PostStore};

/// Publish request as the CLI and HTTP layers receive it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub retry: bool,
    /// Falls back to `[publish] default_target`
    #[serde(default)]
    pub target: Option<PublishTarget>,
    /// Overrides `[metricool] workspace_id` for this request
    #[serde(default)]
    pub workspace_id: Option<String>,
}

pub struct PostdeckService {
    config: Arc<Config>,
    lifecycle: PostLifecycle,
    credentials: Arc<CredentialManager>,
    event_bus: EventBus,
    publishers: RwLock<HashMap<PublishTarget, Arc<dyn Publisher>>>,
}

impl PostdeckService {
    /// Service from the default configuration file
    pub async fn new() -> Result<Self> {
        Self::from_config(Config::load()?).await
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let store = open_store(&config.storage).await?;
        let credentials = CredentialManager::new(&config.credentials)?;
        Ok(Self::from_parts(config, store, credentials))
    }

    /// Assemble from already-built parts (tests, embedding)
    pub fn from_parts(
        config: Config,
        store: Arc<dyn PostStore>,
        credentials: CredentialManager,
    ) -> Self {
        let event_bus = EventBus::new(100);
        let lifecycle = PostLifecycle::new(store, event_bus.clone())
            .require_channels(config.posts.require_channels)
            .publish_timeout(config.publish.timeout());

        tracing::debug!(
            "Service ready: {} store, {} credentials",
            lifecycle.store().backend_name(),
            credentials.backend_name()
        );

        Self {
            config: Arc::new(config),
            lifecycle,
            credentials: Arc::new(credentials),
            event_bus,
            publishers: RwLock::new(HashMap::new()),
        }
    }

    pub fn lifecycle(&self) -> &PostLifecycle {
        &self.lifecycle
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    /// Use `publisher` for `target` instead of building one from config
    pub fn register_publisher(&self, target: PublishTarget, publisher: Arc<dyn Publisher>) {
        self.publishers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(target, publisher);
    }

    /// Target named in `[publish] default_target`
    pub fn default_target(&self) -> Result<PublishTarget> {
        self.config
            .publish
            .default_target
            .parse()
            .map_err(|e: String| ConfigError::InvalidValue(format!("publish.default_target: {}", e)).into())
    }

    /// Publisher for `target`, honoring registered overrides
    pub fn publisher_for(
        &self,
        target: PublishTarget,
        workspace_id: Option<&str>,
    ) -> Result<Arc<dyn Publisher>> {
        if let Some(publisher) = self
            .publishers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&target)
        {
            return Ok(Arc::clone(publisher));
        }

        let publisher: Arc<dyn Publisher> = match target {
            PublishTarget::Metricool => {
                let workspace = workspace_id
                    .map(str::to_string)
                    .or_else(|| self.config.metricool.workspace_id.clone());
                Arc::new(MetricoolPublisher::new(self.metricool_client()?, workspace))
            }
            PublishTarget::Linkedin => {
                let linkedin = &self.config.linkedin;
                Arc::new(LinkedInPublisher::with_outbox(
                    expand_path(&linkedin.outbox_dir),
                    linkedin.max_chars,
                    linkedin.max_media,
                ))
            }
        };
        Ok(publisher)
    }

    /// Resolve the target and publish through it
    pub async fn publish(&self, id: i64, request: PublishRequest) -> Result<PublishReport> {
        let target = match request.target {
            Some(target) => target,
            None => self.default_target()?,
        };
        self.lifecycle.check_publishable(id, request.retry).await?;
        let publisher = self.publisher_for(target, request.workspace_id.as_deref())?;

        let options = PublishOptions {
            dry_run: request.dry_run,
            retry: request.retry,
        };
        self.lifecycle.publish(id, options, publisher.as_ref()).await
    }

    /// Metricool client authenticated with the configured key, if any
    pub fn metricool_client(&self) -> Result<MetricoolClient> {
        let metricool = &self.config.metricool;
        let api_key = self.credentials.resolve_optional(&metricool.api_key_name)?;
        Ok(MetricoolClient::new(
            &metricool.base_url,
            api_key,
            self.config.publish.timeout(),
        )?)
    }

    pub async fn workspaces(&self) -> Result<Vec<Workspace>> {
        Ok(self.metricool_client()?.workspaces().await?)
    }

    pub async fn channels(&self, workspace_id: &str) -> Result<Vec<Channel>> {
        Ok(self.metricool_client()?.channels(workspace_id).await?)
    }

    /// Composer built from `[compose]`; fails when the section is absent
    pub fn composer(&self) -> Result<Composer> {
        let compose = self.config.compose.as_ref().ok_or_else(|| {
            PostdeckError::Config(ConfigError::MissingField("compose.model".to_string()))
        })?;
        let api_key = self.credentials.resolve(&compose.api_key_name)?;
        Composer::new(compose, api_key)
    }

    pub async fn compose(&self, request: &ComposeRequest) -> Result<ComposedPost> {
        self.composer()?.draft(request).await
    }
}
