//! In-memory post store for tests and ephemeral runs

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::PostStore;
use crate::error::Result;
use crate::types::Post;

#[derive(Default)]
struct Inner {
    posts: BTreeMap<i64, Post>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.inner.read().await.posts.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Post>> {
        Ok(self.inner.read().await.posts.values().rev().cloned().collect())
    }

    async fn put(&self, post: &Post) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.last_id = inner.last_id.max(post.id);
        inner.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.inner.write().await.posts.remove(&id).is_some())
    }

    async fn next_id(&self) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        Ok(inner.last_id)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
