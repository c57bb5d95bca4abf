//! # chirp-shared
//!
//! Types and rules shared by the Chirp store and server: identifiers, the
//! author profile record, post content validation and identity-provider
//! session tokens.

pub mod constants;
pub mod content;
pub mod error;
pub mod session;
pub mod types;

pub use error::{ContentError, SessionError};
pub use types::{AuthorProfile, PostId, UserId};
