//! Author profile lookup against the identity provider.
//!
//! The identity provider is a second system of record: posts reference its
//! user ids, and the feed joins them to public profiles in memory.  It is
//! reached through the narrow [`UserDirectory`] trait so the service never
//! depends on a concrete provider.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use chirp_shared::constants::DIRECTORY_BATCH_LIMIT;
use chirp_shared::{AuthorProfile, UserId};

use crate::error::IdentityError;

/// Resolves user ids to public profiles.
///
/// Ids the provider does not know are left out of the returned map; they
/// are not an error at this level.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve_profiles(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, AuthorProfile>, IdentityError>;
}

// ---------------------------------------------------------------------------
// Hosted provider
// ---------------------------------------------------------------------------

/// Client for the hosted identity provider's user list endpoint
/// (`GET {base}/v1/users?user_id=..&limit=..`).
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl HttpUserDirectory {
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        info!(url = %base_url, "Hosted user directory configured");

        Ok(Self {
            client,
            base_url,
            secret_key: secret_key.into(),
        })
    }

    async fn fetch_batch(&self, ids: &[UserId]) -> Result<Vec<AuthorProfile>, IdentityError> {
        let limit = DIRECTORY_BATCH_LIMIT.to_string();
        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("user_id", id.as_str())).collect();
        query.push(("limit", limit.as_str()));

        let response = self
            .client
            .get(format!("{}/v1/users", self.base_url))
            .bearer_auth(&self.secret_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<AuthorProfile>>()
            .await
            .map_err(|e| IdentityError::Decode(e.to_string()))
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn resolve_profiles(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, AuthorProfile>, IdentityError> {
        let mut profiles = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(DIRECTORY_BATCH_LIMIT) {
            for profile in self.fetch_batch(chunk).await? {
                profiles.insert(profile.id.clone(), profile);
            }
        }

        debug!(
            requested = ids.len(),
            resolved = profiles.len(),
            "Resolved author profiles"
        );
        Ok(profiles)
    }
}

// ---------------------------------------------------------------------------
// Static directory
// ---------------------------------------------------------------------------

/// Fixed in-memory directory, for development instances and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: HashMap<UserId, AuthorProfile>,
}

impl StaticUserDirectory {
    pub fn new(profiles: impl IntoIterator<Item = AuthorProfile>) -> Self {
        Self {
            users: profiles
                .into_iter()
                .map(|profile| (profile.id.clone(), profile))
                .collect(),
        }
    }

    /// Load a JSON array of user records.
    pub fn from_json_file(path: &Path) -> Result<Self, IdentityError> {
        let raw = std::fs::read_to_string(path)?;
        let profiles: Vec<AuthorProfile> =
            serde_json::from_str(&raw).map_err(|e| IdentityError::Decode(e.to_string()))?;

        info!(
            path = %path.display(),
            users = profiles.len(),
            "Static user directory loaded"
        );
        Ok(Self::new(profiles))
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn resolve_profiles(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, AuthorProfile>, IdentityError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}
