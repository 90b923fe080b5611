//! Community feed routes
//!
//! Mounted under `/api/community`. Reading is open to every session, writing
//! needs `PostCommunity`.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::response::{created, ok, ApiResponse};
use super::session::Session;
use super::state::{GuardedCommunityManager, ServerState};
use super::ServerConfig;
use crate::community::{
    Comment, CommentDraft, LikeState, PostDraft, PostView, Privacy, ShareRequest,
};
use crate::error::ServiceResult;
use crate::user::Permission;

const MAX_PAGE_SIZE: usize = 100;
/// SQLite binds integers as i64.
const MAX_OFFSET: usize = i64::MAX as usize;

#[derive(Deserialize, Debug, Default)]
pub struct PaginationQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PaginationQuery {
    /// (limit, offset), with the limit defaulted to the configured page size
    /// and capped. Offsets past what SQLite can bind are clamped, and simply
    /// yield an empty page.
    pub fn resolve(&self, default_limit: usize) -> (usize, usize) {
        (
            self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
            self.offset.unwrap_or(0).min(MAX_OFFSET),
        )
    }
}

#[derive(Deserialize, Debug)]
struct PrivacyBody {
    pub privacy: Privacy,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VoteBody {
    pub option_index: usize,
}

// ============================================================================
// Posts
// ============================================================================

/// GET /feed
async fn get_feed(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    State(config): State<ServerConfig>,
    Query(pagination): Query<PaginationQuery>,
) -> ServiceResult<ApiResponse<Vec<PostView>>> {
    let (limit, offset) = pagination.resolve(config.feed_page_size);
    Ok(ok(community.feed(&session.actor(), limit, offset)?))
}

/// GET /users/{id}/posts
async fn get_user_posts(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    State(config): State<ServerConfig>,
    Path(author_id): Path<usize>,
    Query(pagination): Query<PaginationQuery>,
) -> ServiceResult<ApiResponse<Vec<PostView>>> {
    let (limit, offset) = pagination.resolve(config.feed_page_size);
    Ok(ok(community.user_posts(
        &session.actor(),
        author_id,
        limit,
        offset,
    )?))
}

/// POST /posts
async fn create_post(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Json(draft): Json<PostDraft>,
) -> ServiceResult<ApiResponse<PostView>> {
    session.require(Permission::PostCommunity)?;
    Ok(created(community.create_post(&session.actor(), draft)?))
}

/// GET /posts/{id}
async fn get_post(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
) -> ServiceResult<ApiResponse<PostView>> {
    Ok(ok(community.get_post(&session.actor(), &post_id)?))
}

/// DELETE /posts/{id}
async fn delete_post(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
) -> ServiceResult<ApiResponse<()>> {
    session.require(Permission::PostCommunity)?;
    community.delete_post(&session.actor(), &post_id)?;
    Ok(ok(()))
}

/// PUT /posts/{id}/privacy
async fn set_privacy(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
    Json(body): Json<PrivacyBody>,
) -> ServiceResult<ApiResponse<PostView>> {
    session.require(Permission::PostCommunity)?;
    Ok(ok(community.set_privacy(
        &session.actor(),
        &post_id,
        body.privacy,
    )?))
}

/// POST /posts/{id}/share
async fn share_post(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
    body: Option<Json<ShareRequest>>,
) -> ServiceResult<ApiResponse<PostView>> {
    session.require(Permission::PostCommunity)?;
    let caption = body.and_then(|Json(request)| request.caption);
    Ok(created(community.share(&session.actor(), &post_id, caption)?))
}

/// POST /posts/{id}/like
async fn toggle_like(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
) -> ServiceResult<ApiResponse<LikeState>> {
    session.require(Permission::PostCommunity)?;
    Ok(ok(community.toggle_like(&session.actor(), &post_id)?))
}

/// POST /posts/{id}/vote
async fn vote(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
    Json(body): Json<VoteBody>,
) -> ServiceResult<ApiResponse<PostView>> {
    session.require(Permission::PostCommunity)?;
    Ok(ok(community.vote(
        &session.actor(),
        &post_id,
        body.option_index,
    )?))
}

// ============================================================================
// Comments
// ============================================================================

/// GET /posts/{id}/comments
async fn list_comments(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
) -> ServiceResult<ApiResponse<Vec<Comment>>> {
    Ok(ok(community.list_comments(&session.actor(), &post_id)?))
}

/// POST /posts/{id}/comments
async fn add_comment(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
    Json(draft): Json<CommentDraft>,
) -> ServiceResult<ApiResponse<Comment>> {
    session.require(Permission::PostCommunity)?;
    Ok(created(community.add_comment(
        &session.actor(),
        &post_id,
        draft,
    )?))
}

/// DELETE /posts/{id}/comments/{comment_id}
async fn delete_comment(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ServiceResult<ApiResponse<()>> {
    session.require(Permission::PostCommunity)?;
    community.delete_comment(&session.actor(), &post_id, &comment_id)?;
    Ok(ok(()))
}

pub fn community_routes() -> Router<ServerState> {
    Router::new()
        .route("/feed", get(get_feed))
        .route("/users/{id}/posts", get(get_user_posts))
        .route("/posts", post(create_post))
        .route("/posts/{id}", get(get_post).delete(delete_post))
        .route("/posts/{id}/privacy", put(set_privacy))
        .route("/posts/{id}/share", post(share_post))
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/vote", post(vote))
        .route(
            "/posts/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}",
            delete(delete_comment),
        )
}
