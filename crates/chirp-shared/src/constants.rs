/// Application name
pub const APP_NAME: &str = "Chirp";

/// Minimum post length in characters
pub const MIN_POST_CHARS: usize = 1;

/// Maximum post length in characters
pub const MAX_POST_CHARS: usize = 280;

/// Number of posts returned by the feed
pub const FEED_LIMIT: usize = 100;

/// Maximum number of user ids per identity directory lookup
pub const DIRECTORY_BATCH_LIMIT: usize = 100;

/// Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Returned by the authenticated-only demo procedure
pub const SECRET_MESSAGE: &str = "you can now see this secret message!";
