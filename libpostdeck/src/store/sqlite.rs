//! SQLite-backed post store

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use super::PostStore;
use crate::error::{DbError, Result};
use crate::types::{Post, PostStatus};

const POST_COLUMNS: &str = "id, title, page_name, page_url, body, hashtags, link_url, \
     media_paths, alt_texts, channels, scheduled_for, status, approved, last_error, \
     remote_ref, created_at, updated_at, published_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes work for SQLite URLs on every platform;
        // mode=rwc creates the file when it doesn't exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    fn row_to_post(row: &SqliteRow) -> Result<Post> {
        let status: String = row.try_get("status").map_err(DbError::SqlxError)?;
        let status = status
            .parse::<PostStatus>()
            .map_err(|e| DbError::SqlxError(sqlx::Error::Decode(e.into())))?;

        Ok(Post {
            id: row.try_get("id").map_err(DbError::SqlxError)?,
            title: row.try_get("title").map_err(DbError::SqlxError)?,
            page_name: row.try_get("page_name").map_err(DbError::SqlxError)?,
            page_url: row.try_get("page_url").map_err(DbError::SqlxError)?,
            body: row.try_get("body").map_err(DbError::SqlxError)?,
            hashtags: json_list(row, "hashtags")?,
            link_url: row.try_get("link_url").map_err(DbError::SqlxError)?,
            media_paths: json_list(row, "media_paths")?,
            alt_texts: json_list(row, "alt_texts")?,
            channels: json_list(row, "channels")?,
            scheduled_for: row.try_get("scheduled_for").map_err(DbError::SqlxError)?,
            status,
            approved: row.try_get::<i64, _>("approved").map_err(DbError::SqlxError)? != 0,
            last_error: row.try_get("last_error").map_err(DbError::SqlxError)?,
            remote_ref: row.try_get("remote_ref").map_err(DbError::SqlxError)?,
            created_at: row.try_get("created_at").map_err(DbError::SqlxError)?,
            updated_at: row.try_get("updated_at").map_err(DbError::SqlxError)?,
            published_at: row.try_get("published_at").map_err(DbError::SqlxError)?,
        })
    }
}

/// List columns are stored as JSON arrays
fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.try_get(column).map_err(DbError::SqlxError)?;
    Ok(serde_json::from_str(&raw).map_err(DbError::Serialization)?)
}

fn to_json(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values).map_err(DbError::Serialization)?)
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn get(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(Self::row_to_post).transpose()
    }

    async fn list(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!("SELECT {} FROM posts ORDER BY id DESC", POST_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(Self::row_to_post).collect()
    }

    async fn put(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (
                id, title, page_name, page_url, body, hashtags, link_url,
                media_paths, alt_texts, channels, scheduled_for, status, approved,
                last_error, remote_ref, created_at, updated_at, published_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                page_name = excluded.page_name,
                page_url = excluded.page_url,
                body = excluded.body,
                hashtags = excluded.hashtags,
                link_url = excluded.link_url,
                media_paths = excluded.media_paths,
                alt_texts = excluded.alt_texts,
                channels = excluded.channels,
                scheduled_for = excluded.scheduled_for,
                status = excluded.status,
                approved = excluded.approved,
                last_error = excluded.last_error,
                remote_ref = excluded.remote_ref,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                published_at = excluded.published_at
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.page_name)
        .bind(&post.page_url)
        .bind(&post.body)
        .bind(to_json(&post.hashtags)?)
        .bind(&post.link_url)
        .bind(to_json(&post.media_paths)?)
        .bind(to_json(&post.alt_texts)?)
        .bind(to_json(&post.channels)?)
        .bind(&post.scheduled_for)
        .bind(post.status.as_str())
        .bind(post.approved as i64)
        .bind(&post.last_error)
        .bind(&post.remote_ref)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.published_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    async fn next_id(&self) -> Result<i64> {
        let result = sqlx::query("INSERT INTO post_ids DEFAULT VALUES")
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;
        let id = result.last_insert_rowid();

        // The high-water mark lives in sqlite_sequence; older rows are dead weight
        sqlx::query("DELETE FROM post_ids WHERE id < ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(id)
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PostdeckError;
    use crate::store::contract;
    use crate::types::NewPost;
    use tempfile::TempDir;

    async fn open_temp() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("posts.db");
        let store = SqliteStore::new(db_path.to_str().unwrap()).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let (store, _temp_dir) = open_temp().await;
        contract::exercise(&store).await;
    }

    #[tokio::test]
    async fn test_database_initialization_with_invalid_path() {
        #[cfg(unix)]
        let invalid_path = "/tmp/test\0invalid.db";

        #[cfg(windows)]
        let invalid_path = "C:\\invalid<>path\\test.db";

        let result = SqliteStore::new(invalid_path).await;
        assert!(matches!(result, Err(PostdeckError::Database(_))));
    }

    #[tokio::test]
    async fn test_ids_survive_reopen_without_reuse() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("posts.db");
        let db_path = db_path.to_str().unwrap();

        let last = {
            let store = SqliteStore::new(db_path).await.unwrap();
            let id = store.next_id().await.unwrap();
            store.put(&Post::new(id, NewPost::with_body("x"))).await.unwrap();
            store.delete(id).await.unwrap();
            id
        };

        let store = SqliteStore::new(db_path).await.unwrap();
        assert!(store.next_id().await.unwrap() > last);
    }

    #[tokio::test]
    async fn test_constraint_violation_on_invalid_status() {
        let (store, _temp_dir) = open_temp().await;

        let result = sqlx::query(
            "INSERT INTO posts (id, body, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(99_i64)
        .bind("Test content")
        .bind("Pending")
        .bind(chrono::Utc::now().timestamp())
        .bind(chrono::Utc::now().timestamp())
        .execute(&store.pool)
        .await;

        assert!(result.is_err(), "status column only accepts wire names");
    }

    #[tokio::test]
    async fn test_list_columns_round_trip_in_order() {
        let (store, _temp_dir) = open_temp().await;
        let id = store.next_id().await.unwrap();
        let post = Post::new(
            id,
            NewPost {
                hashtags: vec!["#z".to_string(), "#a".to_string()],
                channels: vec!["ch-2".to_string(), "ch-1".to_string()],
                ..NewPost::with_body("ordered")
            },
        );
        store.put(&post).await.unwrap();

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.hashtags, vec!["#z".to_string(), "#a".to_string()]);
        assert_eq!(stored.channels, vec!["ch-2".to_string(), "ch-1".to_string()]);
    }
}
