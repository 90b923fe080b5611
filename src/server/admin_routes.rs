//! Admin routes, mounted under `/api/admin`
//!
//! User management needs `ManageUsers`; the moderation queue and post
//! removal need `ModerateContent`.

use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::response::{ok, ApiResponse};
use super::session::Session;
use super::state::{GuardedCommunityManager, GuardedMarketplaceManager, ServerState};
use crate::community::CommunityCounts;
use crate::error::ServiceResult;
use crate::learning::LearningCounts;
use crate::marketplace::{Listing, MarketplaceCounts, ModerationRequest};
use crate::user::{Permission, User, UserCounts};

#[derive(Deserialize, Debug)]
struct SetRoleBody {
    pub role: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminStats {
    uptime_seconds: u64,
    users: UserCounts,
    learning: LearningCounts,
    community: CommunityCounts,
    marketplace: MarketplaceCounts,
}

// ============================================================================
// Users
// ============================================================================

/// GET /users
async fn list_users(
    session: Session,
    State(state): State<ServerState>,
) -> ServiceResult<ApiResponse<Vec<User>>> {
    session.require(Permission::ManageUsers)?;
    Ok(ok(state.user_manager.list_users()?))
}

/// GET /stats
async fn get_stats(
    session: Session,
    State(state): State<ServerState>,
) -> ServiceResult<ApiResponse<AdminStats>> {
    session.require(Permission::ManageUsers)?;
    Ok(ok(AdminStats {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        users: state.user_manager.count_users()?,
        learning: state.learning_manager.counts()?,
        community: state.community_manager.counts()?,
        marketplace: state.marketplace_manager.counts()?,
    }))
}

/// PUT /users/{id}/role
async fn set_role(
    session: Session,
    State(state): State<ServerState>,
    Path(user_id): Path<usize>,
    Json(body): Json<SetRoleBody>,
) -> ServiceResult<ApiResponse<User>> {
    session.require(Permission::ManageUsers)?;
    Ok(ok(state
        .user_manager
        .set_role(session.user_id, user_id, &body.role)?))
}

/// PUT /users/{id}/block
async fn block_user(
    session: Session,
    State(state): State<ServerState>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<User>> {
    session.require(Permission::ManageUsers)?;
    Ok(ok(state
        .user_manager
        .set_blocked(session.user_id, user_id, true)?))
}

/// PUT /users/{id}/unblock
async fn unblock_user(
    session: Session,
    State(state): State<ServerState>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<User>> {
    session.require(Permission::ManageUsers)?;
    Ok(ok(state
        .user_manager
        .set_blocked(session.user_id, user_id, false)?))
}

// ============================================================================
// Moderation
// ============================================================================

/// GET /moderation/listings
async fn pending_listings(
    session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
) -> ServiceResult<ApiResponse<Vec<Listing>>> {
    session.require(Permission::ModerateContent)?;
    Ok(ok(marketplace.pending_listings()?))
}

/// PUT /moderation/listings/{id}
async fn moderate_listing(
    session: Session,
    State(marketplace): State<GuardedMarketplaceManager>,
    Path(listing_id): Path<String>,
    Json(request): Json<ModerationRequest>,
) -> ServiceResult<ApiResponse<Listing>> {
    session.require(Permission::ModerateContent)?;
    Ok(ok(marketplace.moderate(
        &session.actor(),
        &listing_id,
        request,
    )?))
}

/// DELETE /posts/{id}
async fn remove_post(
    session: Session,
    State(community): State<GuardedCommunityManager>,
    Path(post_id): Path<String>,
) -> ServiceResult<ApiResponse<()>> {
    session.require(Permission::ModerateContent)?;
    community.delete_post(&session.actor(), &post_id)?;
    Ok(ok(()))
}

pub fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/stats", get(get_stats))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/block", put(block_user))
        .route("/users/{id}/unblock", put(unblock_user))
        .route("/moderation/listings", get(pending_listings))
        .route("/moderation/listings/{id}", put(moderate_listing))
        .route("/posts/{id}", delete(remove_post))
}
