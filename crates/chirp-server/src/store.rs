//! Async access to the post store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chirp_shared::UserId;
use chirp_store::{Database, Post, StoreError};

use crate::error::ServiceError;

#[async_trait]
pub trait PostStore: Send + Sync {
    /// The `limit` most recent posts, newest first.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, ServiceError>;

    /// Persist a new post; the store assigns its id and timestamp.
    async fn create_post(&self, author_id: &UserId, content: &str) -> Result<Post, ServiceError>;
}

/// [`PostStore`] over a SQLite [`Database`].
///
/// The connection is shared behind a mutex and every statement runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqlitePostStore {
    db: Arc<Mutex<Database>>,
}

impl SqlitePostStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.blocking_lock();
            f(&guard)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("store task failed: {e}")))?
        .map_err(ServiceError::from)
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, ServiceError> {
        self.with_db(move |db| db.recent_posts(limit)).await
    }

    async fn create_post(&self, author_id: &UserId, content: &str) -> Result<Post, ServiceError> {
        let author_id = author_id.clone();
        let content = content.to_string();
        self.with_db(move |db| db.create_post(&author_id, &content)).await
    }
}
