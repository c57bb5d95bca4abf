use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Method,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use chirp_shared::constants::{FEED_LIMIT, MAX_POST_CHARS};
use chirp_store::Post;

use crate::auth::Caller;
use crate::config::ServerConfig;
use crate::error::ServiceError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::service::{PostWithAuthor, PostsService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PostsService>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/api/posts.getAll", get(posts_get_all))
        .route("/api/posts.create", post(posts_create))
        .route("/api/posts.getSecretMessage", get(posts_get_secret_message))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    max_post_chars: usize,
    feed_limit: usize,
}

/// Input of `posts.create`. The author always comes from the session, so
/// any author field a client sends is ignored.
#[derive(Debug, Deserialize)]
struct CreatePostInput {
    content: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        max_post_chars: MAX_POST_CHARS,
        feed_limit: FEED_LIMIT,
    })
}

async fn posts_get_all(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<PostWithAuthor>>, ServiceError> {
    debug!(authenticated = caller.is_authenticated(), "Feed requested");
    let feed = state.service.list_posts().await?;
    Ok(Json(feed))
}

async fn posts_create(
    State(state): State<AppState>,
    caller: Caller,
    input: Result<Json<CreatePostInput>, JsonRejection>,
) -> Result<Json<Post>, ServiceError> {
    let author_id = caller.require_user()?;
    let Json(input) = input.map_err(|e| ServiceError::BadRequest(e.body_text()))?;

    let post = state.service.create_post(author_id, &input.content).await?;
    Ok(Json(post))
}

async fn posts_get_secret_message(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<&'static str>, ServiceError> {
    let user_id = caller.require_user()?;
    Ok(Json(state.service.secret_message(user_id)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
