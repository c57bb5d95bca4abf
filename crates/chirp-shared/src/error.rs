use thiserror::Error;

use crate::constants::MAX_POST_CHARS;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("Post content must not be empty")]
    Empty,

    #[error("Post content too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Post content may only contain emoji")]
    NotEmoji,
}

impl ContentError {
    pub fn too_long(len: usize) -> Self {
        Self::TooLong {
            len,
            max: MAX_POST_CHARS,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session token expired")]
    Expired,

    #[error("Invalid session signature")]
    InvalidSignature,

    #[error("Invalid identity provider key")]
    InvalidProviderKey,

    #[error("Malformed session token: {0}")]
    Malformed(String),
}
