//! The posts service: feed listing with author profiles, post creation and
//! the authenticated-only demo message.
//!
//! Posts come from the [`PostStore`], authors from the [`UserDirectory`].
//! The two are joined here, per request, and nothing is kept between calls.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use chirp_shared::constants::{FEED_LIMIT, SECRET_MESSAGE};
use chirp_shared::content::validate_post_content;
use chirp_shared::{AuthorProfile, UserId};
use chirp_store::Post;

use crate::error::ServiceError;
use crate::identity::UserDirectory;
use crate::store::PostStore;

/// Author fields sent along with each feed entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub profile_pic: String,
}

impl AuthorView {
    fn new(profile: &AuthorProfile, name: &str) -> Self {
        Self {
            id: profile.id.clone(),
            name: name.to_string(),
            username: name.to_string(),
            profile_pic: profile.profile_image_url.clone(),
        }
    }
}

/// A feed entry. Built per request and never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: AuthorView,
}

pub struct PostsService {
    store: Arc<dyn PostStore>,
    directory: Arc<dyn UserDirectory>,
}

impl PostsService {
    pub fn new(store: Arc<dyn PostStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// The newest posts (at most [`FEED_LIMIT`]) with their authors.
    ///
    /// Fails as a whole if any post's author is unknown to the directory or
    /// has no display name; a shortened feed is never returned.
    pub async fn list_posts(&self) -> Result<Vec<PostWithAuthor>, ServiceError> {
        let posts = self.store.recent_posts(FEED_LIMIT).await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<UserId> = posts
            .iter()
            .map(|post| post.author_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let profiles = self.directory.resolve_profiles(&author_ids).await?;

        debug!(
            posts = posts.len(),
            authors = author_ids.len(),
            resolved = profiles.len(),
            "Joining feed with author profiles"
        );

        posts
            .into_iter()
            .map(|post| {
                let profile = profiles.get(&post.author_id);
                let Some((profile, name)) =
                    profile.and_then(|p| p.display_name().map(|name| (p, name)))
                else {
                    return Err(ServiceError::AuthorNotFound {
                        post_id: post.id,
                        author_id: post.author_id,
                    });
                };

                let author = AuthorView::new(profile, name);
                Ok(PostWithAuthor { post, author })
            })
            .collect()
    }

    /// Create a post authored by `author_id`, the authenticated caller.
    pub async fn create_post(&self, author_id: &UserId, content: &str) -> Result<Post, ServiceError> {
        validate_post_content(content)?;

        let post = self.store.create_post(author_id, content).await?;

        info!(id = %post.id, author = %author_id.short(), "Post created");
        Ok(post)
    }

    /// Only reachable by authenticated callers.
    pub fn secret_message(&self, _caller: &UserId) -> &'static str {
        SECRET_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use chirp_shared::PostId;
    use chirp_store::Database;

    use crate::error::IdentityError;
    use crate::identity::StaticUserDirectory;
    use crate::store::SqlitePostStore;

    fn profile(id: &str, name: Option<&str>) -> AuthorProfile {
        AuthorProfile {
            id: UserId::new(id),
            username: name.map(str::to_string),
            profile_image_url: format!("https://img.example/{id}.png"),
        }
    }

    /// Counts lookups and remembers the ids of the last one.
    struct RecordingDirectory {
        inner: StaticUserDirectory,
        calls: AtomicUsize,
        last_ids: std::sync::Mutex<Vec<UserId>>,
    }

    impl RecordingDirectory {
        fn new(profiles: Vec<AuthorProfile>) -> Self {
            Self {
                inner: StaticUserDirectory::new(profiles),
                calls: AtomicUsize::new(0),
                last_ids: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for RecordingDirectory {
        async fn resolve_profiles(
            &self,
            ids: &[UserId],
        ) -> Result<HashMap<UserId, AuthorProfile>, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_ids.lock().unwrap() = ids.to_vec();
            self.inner.resolve_profiles(ids).await
        }
    }

    struct FailingDirectory;

    #[async_trait]
    impl UserDirectory for FailingDirectory {
        async fn resolve_profiles(
            &self,
            _ids: &[UserId],
        ) -> Result<HashMap<UserId, AuthorProfile>, IdentityError> {
            Err(IdentityError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    fn post_at(author: &str, content: &str, created_at: chrono::DateTime<Utc>) -> Post {
        Post {
            id: PostId::new(),
            author_id: UserId::new(author),
            content: content.to_string(),
            created_at,
        }
    }

    fn service_with(db: Database, directory: Arc<dyn UserDirectory>) -> PostsService {
        PostsService::new(Arc::new(SqlitePostStore::new(db)), directory)
    }

    fn alice_and_bob() -> Vec<AuthorProfile> {
        vec![profile("u1", Some("alice")), profile("u2", Some("bob"))]
    }

    #[tokio::test]
    async fn test_feed_newest_first_with_authors() {
        let db = Database::open_in_memory().unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let p1 = post_at("u1", "😀", t1);
        let p2 = post_at("u2", "😎", t1 + Duration::minutes(1));
        db.insert_post(&p1).unwrap();
        db.insert_post(&p2).unwrap();

        let service = service_with(db, Arc::new(StaticUserDirectory::new(alice_and_bob())));
        let feed = service.list_posts().await.unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].post.id, p2.id);
        assert_eq!(feed[0].author.name, "bob");
        assert_eq!(feed[1].post.id, p1.id);
        assert_eq!(feed[1].author.name, "alice");
        assert_eq!(feed[1].author.profile_pic, "https://img.example/u1.png");
    }

    #[tokio::test]
    async fn test_missing_author_fails_whole_feed() {
        let db = Database::open_in_memory().unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        db.insert_post(&post_at("u1", "😀", t1)).unwrap();
        db.insert_post(&post_at("u2", "😎", t1 + Duration::minutes(1)))
            .unwrap();

        let directory = StaticUserDirectory::new(vec![profile("u1", Some("alice"))]);
        let service = service_with(db, Arc::new(directory));

        let err = service.list_posts().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::AuthorNotFound { ref author_id, .. } if author_id.as_str() == "u2"
        ));
    }

    #[tokio::test]
    async fn test_unnamed_author_fails_whole_feed() {
        let db = Database::open_in_memory().unwrap();
        db.create_post(&UserId::new("u1"), "😀").unwrap();
        db.create_post(&UserId::new("u3"), "🙃").unwrap();

        let directory =
            StaticUserDirectory::new(vec![profile("u1", Some("alice")), profile("u3", Some(""))]);
        let service = service_with(db, Arc::new(directory));

        assert!(matches!(
            service.list_posts().await,
            Err(ServiceError::AuthorNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_padded_and_whitespace_names_returned_verbatim() {
        let db = Database::open_in_memory().unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        db.insert_post(&post_at("u1", "😀", t1)).unwrap();
        db.insert_post(&post_at("u2", "😎", t1 + Duration::minutes(1)))
            .unwrap();

        let directory = StaticUserDirectory::new(vec![
            profile("u1", Some(" alice ")),
            profile("u2", Some(" ")),
        ]);
        let service = service_with(db, Arc::new(directory));

        let feed = service.list_posts().await.unwrap();
        assert_eq!(feed[0].author.name, " ");
        assert_eq!(feed[0].author.username, " ");
        assert_eq!(feed[1].author.name, " alice ");
        assert_eq!(feed[1].author.username, " alice ");
    }

    #[tokio::test]
    async fn test_feed_capped_and_authors_deduplicated() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..150 {
            let author = if i % 2 == 0 { "u1" } else { "u2" };
            db.create_post(&UserId::new(author), "🔁").unwrap();
        }

        let directory = Arc::new(RecordingDirectory::new(alice_and_bob()));
        let service = service_with(db, directory.clone());

        let feed = service.list_posts().await.unwrap();
        assert_eq!(feed.len(), FEED_LIMIT);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *directory.last_ids.lock().unwrap(),
            vec![UserId::new("u1"), UserId::new("u2")]
        );
    }

    #[tokio::test]
    async fn test_empty_feed_skips_directory() {
        let directory = Arc::new(RecordingDirectory::new(Vec::new()));
        let service = service_with(Database::open_in_memory().unwrap(), directory.clone());

        assert!(service.list_posts().await.unwrap().is_empty());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_directory_failure_is_internal() {
        let db = Database::open_in_memory().unwrap();
        db.create_post(&UserId::new("u1"), "😀").unwrap();
        let service = service_with(db, Arc::new(FailingDirectory));

        let err = service.list_posts().await.unwrap_err();
        assert!(matches!(err, ServiceError::Identity(_)));
    }

    #[tokio::test]
    async fn test_create_post_uses_caller_identity() {
        let service = service_with(
            Database::open_in_memory().unwrap(),
            Arc::new(StaticUserDirectory::new(alice_and_bob())),
        );

        let post = service.create_post(&UserId::new("u2"), "🐢").await.unwrap();
        assert_eq!(post.author_id, UserId::new("u2"));
        assert_eq!(post.content, "🐢");

        let feed = service.list_posts().await.unwrap();
        assert_eq!(feed[0].post, post);
        assert_eq!(feed[0].author.username, "bob");
    }

    #[tokio::test]
    async fn test_create_post_rejects_invalid_content_before_write() {
        let db = Database::open_in_memory().unwrap();
        let store = Arc::new(SqlitePostStore::new(db));
        let service = PostsService::new(store.clone(), Arc::new(StaticUserDirectory::default()));
        let author = UserId::new("u1");

        for bad in [String::new(), "hello".to_string(), "😀".repeat(281)] {
            assert!(matches!(
                service.create_post(&author, &bad).await,
                Err(ServiceError::Validation(_))
            ));
        }

        assert!(store.recent_posts(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_content_creates_distinct_posts() {
        let service = service_with(
            Database::open_in_memory().unwrap(),
            Arc::new(StaticUserDirectory::new(alice_and_bob())),
        );
        let author = UserId::new("u1");

        let a = service.create_post(&author, "🎉").await.unwrap();
        let b = service.create_post(&author, "🎉").await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.content, b.content);
        assert_eq!(a.author_id, b.author_id);
        assert_eq!(service.list_posts().await.unwrap().len(), 2);
    }

    #[test]
    fn test_secret_message() {
        let service = PostsService::new(
            Arc::new(SqlitePostStore::new(Database::open_in_memory().unwrap())),
            Arc::new(StaticUserDirectory::default()),
        );
        assert_eq!(
            service.secret_message(&UserId::new("u1")),
            SECRET_MESSAGE
        );
    }
}
