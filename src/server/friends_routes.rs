//! Friend request routes, mounted under `/api/friends`

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};

use super::response::{created, ok, ApiResponse};
use super::session::Session;
use super::state::{GuardedFriendManager, ServerState};
use crate::error::ServiceResult;
use crate::relations::FriendRequests;
use crate::user::{Permission, PublicProfile};

/// GET /
async fn list_friends(
    session: Session,
    State(friends): State<GuardedFriendManager>,
) -> ServiceResult<ApiResponse<Vec<PublicProfile>>> {
    Ok(ok(friends.list_friends(session.user_id)?))
}

/// GET /requests
async fn list_requests(
    session: Session,
    State(friends): State<GuardedFriendManager>,
) -> ServiceResult<ApiResponse<FriendRequests>> {
    Ok(ok(friends.list_requests(session.user_id)?))
}

/// POST /requests/{user_id}
async fn send_request(
    session: Session,
    State(friends): State<GuardedFriendManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<()>> {
    session.require(Permission::PostCommunity)?;
    friends.send_request(session.user_id, user_id)?;
    Ok(created(()))
}

/// POST /requests/{user_id}/accept
async fn accept_request(
    session: Session,
    State(friends): State<GuardedFriendManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<PublicProfile>> {
    session.require(Permission::PostCommunity)?;
    Ok(ok(friends.accept_request(session.user_id, user_id)?))
}

/// POST /requests/{user_id}/reject
async fn reject_request(
    session: Session,
    State(friends): State<GuardedFriendManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<()>> {
    friends.reject_request(session.user_id, user_id)?;
    Ok(ok(()))
}

/// DELETE /{user_id}
async fn remove_friend(
    session: Session,
    State(friends): State<GuardedFriendManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<()>> {
    friends.remove_friend(session.user_id, user_id)?;
    Ok(ok(()))
}

pub fn friends_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_friends))
        .route("/requests", get(list_requests))
        .route("/requests/{user_id}", post(send_request))
        .route("/requests/{user_id}/accept", post(accept_request))
        .route("/requests/{user_id}/reject", post(reject_request))
        .route("/{user_id}", delete(remove_friend))
}
