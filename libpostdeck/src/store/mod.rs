//! Persistence stores for post records
//!
//! Every backend honors the same contract: records are stored and returned
//! as exact copies, ids handed out by [`PostStore::next_id`] are monotonic
//! and never reused (even after a delete), and [`PostStore::list`] returns
//! the most recent post first.
//!
//! The store never changes a post on its own. Status changes, error
//! annotations and timestamps are the lifecycle manager's job.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{expand_path, StorageBackend, StorageConfig};
use crate::error::Result;
use crate::types::Post;

pub mod json;
pub mod memory;
pub mod sqlite;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Fetch one post
    async fn get(&self, id: i64) -> Result<Option<Post>>;

    /// Snapshot of every post, descending id
    async fn list(&self) -> Result<Vec<Post>>;

    /// Insert or replace the record with `post.id`
    async fn put(&self, post: &Post) -> Result<()>;

    /// Remove a record; `false` when nothing was stored under `id`
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Allocate the next post id
    async fn next_id(&self) -> Result<i64>;

    /// Backend identifier for logs ("memory", "json", "sqlite")
    fn backend_name(&self) -> &str;
}

/// Open the backend selected in configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn PostStore>> {
    let store: Arc<dyn PostStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Json => Arc::new(JsonFileStore::open(expand_path(&config.path)).await?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::new(&config.path).await?),
    };

    tracing::debug!("Opened {} post store", store.backend_name());
    Ok(store)
}

/// Sort posts most-recent-first
pub(crate) fn sort_descending(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.id.cmp(&a.id));
}
