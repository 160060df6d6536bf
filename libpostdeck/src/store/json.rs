//! Flat JSON file post store
//!
//! The whole store is one document, `{ "next_id": n, "posts": [...] }`,
//! rewritten on every mutation. Writes go to a sibling temp file that is then
//! renamed over the original, so a crash mid-write leaves the previous
//! document intact. The in-memory copy only changes once the write landed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{sort_descending, PostStore};
use crate::error::{DbError, Result};
use crate::types::Post;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Document {
    next_id: i64,
    #[serde(default)]
    posts: Vec<Post>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            next_id: 1,
            posts: Vec::new(),
        }
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl JsonFileStore {
    /// Open (or lazily create) the document at `path`
    ///
    /// A missing file is an empty store. A file that does not parse is an
    /// error rather than silently starting over.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DbError::IoError)?;
        }

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(DbError::Serialization)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(DbError::IoError(e).into()),
        };

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &Document) -> Result<()> {
        let content = serde_json::to_string_pretty(document).map_err(DbError::Serialization)?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(DbError::IoError)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(DbError::IoError)?;
        Ok(())
    }
}

#[async_trait]
impl PostStore for JsonFileStore {
    async fn get(&self, id: i64) -> Result<Option<Post>> {
        let document = self.document.lock().await;
        Ok(document.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Post>> {
        let mut posts = self.document.lock().await.posts.clone();
        sort_descending(&mut posts);
        Ok(posts)
    }

    async fn put(&self, post: &Post) -> Result<()> {
        let mut document = self.document.lock().await;
        let mut next = document.clone();

        match next.posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post.clone(),
            None => next.posts.push(post.clone()),
        }
        next.next_id = next.next_id.max(post.id + 1);

        self.persist(&next).await?;
        *document = next;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut document = self.document.lock().await;
        if !document.posts.iter().any(|p| p.id == id) {
            return Ok(false);
        }

        let mut next = document.clone();
        next.posts.retain(|p| p.id != id);

        self.persist(&next).await?;
        *document = next;
        Ok(true)
    }

    async fn next_id(&self) -> Result<i64> {
        let mut document = self.document.lock().await;
        let id = document.next_id;
        let next = Document {
            next_id: id + 1,
            posts: document.posts.clone(),
        };

        self.persist(&next).await?;
        *document = next;
        Ok(id)
    }

    fn backend_name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use crate::types::{NewPost, PostStatus};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_store_contract() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path().join("data.json"))
            .await
            .unwrap();
        contract::exercise(&store).await;
    }

    #[tokio::test]
    async fn test_json_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("data.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            let id = store.next_id().await.unwrap();
            let mut post = Post::new(id, NewPost::with_body("Persisted"));
            post.status = PostStatus::Approved;
            post.approved = true;
            store.put(&post).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let posts = reopened.list().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].body, "Persisted");
        assert_eq!(posts[0].status, PostStatus::Approved);
        assert_eq!(reopened.next_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_json_store_ids_not_reused_after_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let id = store.next_id().await.unwrap();
        store.put(&Post::new(id, NewPost::with_body("gone"))).await.unwrap();
        assert!(store.delete(id).await.unwrap());
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.next_id().await.unwrap() > id);
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(
            result,
            Err(crate::error::PostdeckError::Database(DbError::Serialization(_)))
        ));
    }

    #[tokio::test]
    async fn test_json_store_ignores_unknown_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(&path, r#"{ "next_id": 4, "posts": [], "api_keys": {} }"#).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.next_id().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let id = store.next_id().await.unwrap();
        let post = Post::new(id, NewPost::with_body("Steady"));
        store.put(&post).await.unwrap();

        // A directory where the temp file should go makes every write fail
        std::fs::create_dir(temp_dir.path().join("data.json.tmp")).unwrap();

        let mut approved = post.clone();
        approved.status = PostStatus::Approved;
        approved.approved = true;
        assert!(store.put(&approved).await.is_err());
        assert!(store.delete(id).await.is_err());
        assert!(store.next_id().await.is_err());

        assert_eq!(store.get(id).await.unwrap(), Some(post.clone()));
        assert_eq!(store.list().await.unwrap().len(), 1);

        std::fs::remove_dir(temp_dir.path().join("data.json.tmp")).unwrap();
        assert_eq!(store.next_id().await.unwrap(), id + 1);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get(id).await.unwrap(), Some(post));
    }
}
