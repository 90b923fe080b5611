//! Notification routes, mounted under `/api/notifications`

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use serde::Serialize;

use super::response::{ok, ApiResponse};
use super::session::Session;
use super::state::ServerState;
use crate::error::ServiceResult;
use crate::notifications::{Notification, Notifier};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCountResponse {
    unread_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkAllReadResponse {
    marked: usize,
}

async fn list_notifications(
    session: Session,
    State(notifier): State<Notifier>,
) -> ServiceResult<ApiResponse<Vec<Notification>>> {
    Ok(ok(notifier.list(session.user_id)?))
}

async fn unread_count(
    session: Session,
    State(notifier): State<Notifier>,
) -> ServiceResult<ApiResponse<UnreadCountResponse>> {
    Ok(ok(UnreadCountResponse {
        unread_count: notifier.unread_count(session.user_id)?,
    }))
}

async fn mark_read(
    session: Session,
    State(notifier): State<Notifier>,
    Path(notification_id): Path<String>,
) -> ServiceResult<ApiResponse<Notification>> {
    Ok(ok(notifier.mark_read(session.user_id, &notification_id)?))
}

async fn mark_all_read(
    session: Session,
    State(notifier): State<Notifier>,
) -> ServiceResult<ApiResponse<MarkAllReadResponse>> {
    Ok(ok(MarkAllReadResponse {
        marked: notifier.mark_all_read(session.user_id)?,
    }))
}

pub fn notification_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/{id}/read", put(mark_read))
}
