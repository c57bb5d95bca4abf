use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use chirp_shared::{ContentError, PostId, UserId};
use chirp_store::StoreError;

/// Failures talking to the identity provider's user directory.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid user directory data: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error kinds exposed at the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    TooManyRequests,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid post content: {0}")]
    Validation(#[from] ContentError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Author for post not found")]
    AuthorNotFound { post_id: PostId, author_id: UserId },

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) | ServiceError::BadRequest(_) => ErrorCode::BadRequest,
            ServiceError::Unauthorized => ErrorCode::Unauthorized,
            ServiceError::RateLimited { .. } => ErrorCode::TooManyRequests,
            ServiceError::AuthorNotFound { .. }
            | ServiceError::Store(_)
            | ServiceError::Identity(_)
            | ServiceError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let code = self.code();

        let message = match &self {
            ServiceError::AuthorNotFound { post_id, author_id } => {
                tracing::error!(
                    post = %post_id,
                    author = %author_id,
                    "Author for post not found, failing feed"
                );
                self.to_string()
            }
            ServiceError::Store(_) | ServiceError::Identity(_) | ServiceError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": message,
            }
        });

        let mut response = (code.status(), axum::Json(body)).into_response();
        if let ServiceError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
