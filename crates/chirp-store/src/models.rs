//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to API callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirp_shared::{PostId, UserId};

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A short emoji-only post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique post identifier, assigned by the store.
    pub id: PostId,
    /// Identity-provider id of the author. Not validated locally.
    pub author_id: UserId,
    /// Post body.
    pub content: String,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
}
