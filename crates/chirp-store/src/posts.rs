use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::params;
#[cfg(test)]
use rusqlite::OptionalExtension;
use uuid::Uuid;

use chirp_shared::{PostId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::models::Post;

// Fixed-width UTC timestamps sort lexically in chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    /// Store a new post. The id and creation timestamp are assigned here.
    pub fn create_post(&self, author_id: &UserId, content: &str) -> Result<Post> {
        let post = Post {
            id: PostId::new(),
            author_id: author_id.clone(),
            content: content.to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };

        self.insert_post(&post)?;

        tracing::debug!(id = %post.id, author = %author_id.short(), "post stored");
        Ok(post)
    }

    /// Insert a fully-formed post, keeping its id and timestamp.
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.conn().execute(
            "INSERT INTO posts (id, author_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                post.id.to_string(),
                post.author_id.as_str(),
                post.content,
                format_timestamp(&post.created_at),
            ],
        )?;
        Ok(())
    }

    /// The `limit` most recent posts, newest first. Posts sharing a
    /// timestamp come back in reverse insertion order.
    pub fn recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, author_id, content, created_at
             FROM posts
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }
}

#[cfg(test)]
impl Database {
    fn get_post_by_id(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, author_id, content, created_at
                 FROM posts WHERE id = ?1",
                params![id.to_string()],
                row_to_post,
            )
            .optional()?)
    }

    fn count_posts(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id_str: String = row.get(0)?;
    let author_id: String = row.get(1)?;
    let content: String = row.get(2)?;
    let ts_str: String = row.get(3)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Post {
        id: PostId(id),
        author_id: UserId(author_id),
        content,
        created_at,
    })
}
