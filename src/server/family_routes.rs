//! Parent/child supervision routes
//!
//! Mounted under `/api/family`. Only Parent and Child accounts have family
//! links. Blocked children still reach these routes, since confirming a
//! parent link is how they get unblocked.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::response::{created, ok, ApiResponse};
use super::session::Session;
use super::state::{GuardedFamilyManager, GuardedLearningManager, ServerState};
use crate::error::{ServiceError, ServiceResult};
use crate::learning::{CourseProgress, EnrollmentOverview};
use crate::relations::{FamilyLinkState, FamilyRequestEntry};
use crate::user::{Permission, PublicProfile};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkStateResponse {
    state: FamilyLinkState,
}

#[derive(Deserialize, Debug)]
struct ChildlockBody {
    /// None clears the childlock.
    pub password: Option<String>,
}

#[derive(Deserialize, Debug)]
struct VerifyChildlockBody {
    pub password: String,
}

#[derive(Serialize)]
struct VerifyChildlockResponse {
    valid: bool,
}

fn require_family_account(session: &Session) -> ServiceResult<()> {
    if session.role.permissions().contains(&Permission::ManageFamily) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "Only Parent and Child accounts have family links",
        ))
    }
}

// ============================================================================
// Link requests
// ============================================================================

/// POST /requests/{user_id}
async fn request_link(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<LinkStateResponse>> {
    require_family_account(&session)?;
    let state = family.request_link(session.user_id, user_id)?;
    Ok(created(LinkStateResponse { state }))
}

/// POST /requests/{user_id}/accept
async fn accept_link(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<LinkStateResponse>> {
    require_family_account(&session)?;
    let state = family.accept_link(session.user_id, user_id)?;
    Ok(ok(LinkStateResponse { state }))
}

/// POST /requests/{user_id}/reject
async fn reject_link(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<()>> {
    require_family_account(&session)?;
    family.reject_link(session.user_id, user_id)?;
    Ok(ok(()))
}

/// GET /requests
async fn list_requests(
    session: Session,
    State(family): State<GuardedFamilyManager>,
) -> ServiceResult<ApiResponse<Vec<FamilyRequestEntry>>> {
    Ok(ok(family.list_requests(session.user_id)?))
}

/// DELETE /links/{user_id}
async fn unlink(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<()>> {
    require_family_account(&session)?;
    family.unlink(session.user_id, user_id)?;
    Ok(ok(()))
}

/// GET /children
async fn list_children(
    session: Session,
    State(family): State<GuardedFamilyManager>,
) -> ServiceResult<ApiResponse<Vec<PublicProfile>>> {
    Ok(ok(family.list_children(session.user_id)?))
}

/// GET /parents
async fn list_parents(
    session: Session,
    State(family): State<GuardedFamilyManager>,
) -> ServiceResult<ApiResponse<Vec<PublicProfile>>> {
    Ok(ok(family.list_parents(session.user_id)?))
}

// ============================================================================
// Supervision
// ============================================================================

/// PUT /children/{child_id}/childlock
async fn set_childlock(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    Path(child_id): Path<usize>,
    Json(body): Json<ChildlockBody>,
) -> ServiceResult<ApiResponse<()>> {
    require_family_account(&session)?;
    family.set_childlock(session.user_id, child_id, body.password.as_deref())?;
    Ok(ok(()))
}

/// POST /childlock/verify
async fn verify_childlock(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    Json(body): Json<VerifyChildlockBody>,
) -> ServiceResult<ApiResponse<VerifyChildlockResponse>> {
    let valid = family.verify_childlock(session.user_id, &body.password)?;
    Ok(ok(VerifyChildlockResponse { valid }))
}

/// GET /children/{child_id}/enrollments
async fn child_enrollments(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    State(learning): State<GuardedLearningManager>,
    Path(child_id): Path<usize>,
) -> ServiceResult<ApiResponse<Vec<EnrollmentOverview>>> {
    family.require_linked_parent(session.user_id, child_id)?;
    Ok(ok(learning.user_enrollments(child_id)?))
}

/// GET /children/{child_id}/courses/{course_id}/progress
async fn child_progress(
    session: Session,
    State(family): State<GuardedFamilyManager>,
    State(learning): State<GuardedLearningManager>,
    Path((child_id, course_id)): Path<(usize, String)>,
) -> ServiceResult<ApiResponse<CourseProgress>> {
    family.require_linked_parent(session.user_id, child_id)?;
    Ok(ok(learning.get_progress(child_id, &course_id)?))
}

pub fn family_routes() -> Router<ServerState> {
    Router::new()
        .route("/requests", get(list_requests))
        .route("/requests/{user_id}", post(request_link))
        .route("/requests/{user_id}/accept", post(accept_link))
        .route("/requests/{user_id}/reject", post(reject_link))
        .route("/links/{user_id}", delete(unlink))
        .route("/children", get(list_children))
        .route("/parents", get(list_parents))
        .route("/children/{child_id}/childlock", put(set_childlock))
        .route("/childlock/verify", post(verify_childlock))
        .route("/children/{child_id}/enrollments", get(child_enrollments))
        .route(
            "/children/{child_id}/courses/{course_id}/progress",
            get(child_progress),
        )
}
