//! Postdeck - review-and-publish workflow for social media posts
//!
//! Posts are drafted, reviewed, approved and then handed to a publisher
//! (Metricool, or an outbox consumed by a LinkedIn auto-poster). This crate
//! holds the lifecycle rules, storage backends, publishers and supporting
//! plumbing shared by the `postdeck` CLI and the `postdeck-server` API.

pub mod compose;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod publishers;
pub mod render;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::CredentialManager;
pub use error::{PostdeckError, Result};
pub use publishers::{Outcome, PublishTarget, Publisher};
pub use service::{PostLifecycle, PostdeckService, PublishOptions, PublishReport, PublishRequest};
pub use store::PostStore;
pub use types::{NewPost, Post, PostStatus, PostUpdate};
