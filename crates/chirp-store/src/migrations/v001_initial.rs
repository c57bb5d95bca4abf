//! v001 -- Initial schema creation.
//!
//! Creates the `posts` table.  Authors live in the identity provider, so
//! there is no users table and `author_id` carries no foreign key.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    author_id  TEXT NOT NULL,               -- identity provider user id
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL                -- RFC-3339 UTC, microsecond precision
);

CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_author_id ON posts(author_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
