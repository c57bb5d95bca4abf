//! # chirp-server
//!
//! HTTP server for Chirp, a feed of short emoji-only posts.
//!
//! This binary provides:
//! - **Posts procedures** (`posts.getAll`, `posts.create`,
//!   `posts.getSecretMessage`) over a JSON call boundary (axum)
//! - **Session verification** of identity-provider signed bearer tokens
//! - **Author lookup** against the identity provider's user directory
//! - **SQLite storage** of posts
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod config;
mod error;
mod identity;
mod rate_limit;
mod service;
mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chirp_store::Database;

use crate::api::AppState;
use crate::config::{DatabaseLocation, DirectorySource, ServerConfig};
use crate::identity::{HttpUserDirectory, StaticUserDirectory, UserDirectory};
use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::service::PostsService;
use crate::store::SqlitePostStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chirp_server=debug")),
        )
        .init();

    info!("Starting Chirp server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    if config.identity_pubkey == [0u8; 32] {
        warn!("IDENTITY_PUBKEY not set, every session will be rejected");
    }

    // -----------------------------------------------------------------------
    // 3. Construct collaborators
    // -----------------------------------------------------------------------
    let database = match &config.database {
        DatabaseLocation::Default => Database::new()?,
        DatabaseLocation::Path(path) => Database::open_at(path)?,
        DatabaseLocation::Memory => {
            warn!("Using an in-memory database, posts are lost on exit");
            Database::open_in_memory()?
        }
    };
    let store = Arc::new(SqlitePostStore::new(database));

    let directory: Arc<dyn UserDirectory> = match &config.directory {
        DirectorySource::Hosted {
            api_url,
            secret_key,
        } => Arc::new(HttpUserDirectory::new(
            api_url.as_str(),
            secret_key.as_str(),
            config.identity_timeout,
        )?),
        DirectorySource::File(path) => Arc::new(StaticUserDirectory::from_json_file(path)?),
        DirectorySource::Empty => {
            warn!("No user directory configured, feeds with posts will fail");
            Arc::new(StaticUserDirectory::default())
        }
    };

    let service = Arc::new(PostsService::new(store, directory));

    // Rate limiter: purge buckets idle >10 min every 5 minutes
    let rate_limiter = RateLimiter::new(RateLimitPolicy::from_config(&config));
    rate_limiter.spawn_purge_task(Duration::from_secs(300), Duration::from_secs(600));

    let http_addr = config.http_addr;
    let app_state = AppState {
        service,
        rate_limiter,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
