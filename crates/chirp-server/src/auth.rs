//! Caller identity for each request.
//!
//! Clients present the identity provider's signed session as
//! `Authorization: Bearer <token>`.  A missing or unusable token makes the
//! caller anonymous; only protected procedures turn that into an error.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use tracing::warn;

use chirp_shared::session::{verify_session_token, SessionToken};
use chirp_shared::{SessionError, UserId};

use crate::api::AppState;
use crate::error::ServiceError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    user_id: Option<UserId>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The caller's user id, or `Unauthorized` for anonymous callers.
    pub fn require_user(&self) -> Result<&UserId, ServiceError> {
        self.user_id.as_ref().ok_or(ServiceError::Unauthorized)
    }

    pub fn from_headers(headers: &HeaderMap, provider_pubkey: &[u8; 32]) -> Self {
        let Some(raw) = bearer_token(headers) else {
            return Self::anonymous();
        };

        match authenticate(raw, provider_pubkey) {
            Ok(user_id) => Self::authenticated(user_id),
            Err(e) => {
                warn!(error = %e, "Rejected session token");
                Self::anonymous()
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(raw: &str, provider_pubkey: &[u8; 32]) -> Result<UserId, SessionError> {
    let token = SessionToken::decode(raw)?;
    verify_session_token(&token, provider_pubkey)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(
            &parts.headers,
            &state.config.identity_pubkey,
        ))
    }
}
