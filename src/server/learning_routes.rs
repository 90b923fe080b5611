//! Course catalog, enrollment and progress routes
//!
//! Mounted under `/api/learning`. Reading needs `AccessCourses`, enrolling
//! and recording progress `EnrollCourses`, authoring `CreateCourses`.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::response::{created, ok, ApiResponse};
use super::session::Session;
use super::state::{GuardedLearningManager, ServerState};
use crate::error::ServiceResult;
use crate::learning::{
    Course, CourseDraft, CourseProgress, CourseUpdate, Enrollment, EnrollmentOverview,
    QuizAttempt, QuizAttemptOutcome, QuizResult,
};
use crate::user::Permission;

#[derive(Deserialize, Debug, Default)]
struct CourseListQuery {
    pub tag: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CurrentLectureBody {
    pub lecture_index: usize,
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /courses
async fn list_courses(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Query(query): Query<CourseListQuery>,
) -> ServiceResult<ApiResponse<Vec<Course>>> {
    session.require(Permission::AccessCourses)?;
    let tag = query.tag.as_deref().filter(|tag| !tag.trim().is_empty());
    Ok(ok(learning.list_courses(&session.actor(), tag)?))
}

/// POST /courses
async fn create_course(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Json(draft): Json<CourseDraft>,
) -> ServiceResult<ApiResponse<Course>> {
    session.require(Permission::CreateCourses)?;
    Ok(created(learning.create_course(&session.actor(), draft)?))
}

/// GET /courses/{id}
async fn get_course(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
) -> ServiceResult<ApiResponse<Course>> {
    session.require(Permission::AccessCourses)?;
    Ok(ok(learning.get_course(&session.actor(), &course_id)?))
}

/// PUT /courses/{id}
async fn update_course(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
    Json(update): Json<CourseUpdate>,
) -> ServiceResult<ApiResponse<Course>> {
    session.require(Permission::CreateCourses)?;
    Ok(ok(learning.update_course(&session.actor(), &course_id, update)?))
}

/// DELETE /courses/{id}
async fn delete_course(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
) -> ServiceResult<ApiResponse<()>> {
    session.require(Permission::CreateCourses)?;
    learning.delete_course(&session.actor(), &course_id)?;
    Ok(ok(()))
}

// ============================================================================
// Enrollment and progress
// ============================================================================

/// POST /courses/{id}/enroll
async fn enroll(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
) -> ServiceResult<ApiResponse<Enrollment>> {
    session.require(Permission::EnrollCourses)?;
    Ok(created(learning.enroll(session.user_id, &course_id)?))
}

/// DELETE /courses/{id}/enroll
async fn unenroll(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
) -> ServiceResult<ApiResponse<()>> {
    session.require(Permission::EnrollCourses)?;
    learning.unenroll(session.user_id, &course_id)?;
    Ok(ok(()))
}

/// GET /enrollments
async fn my_enrollments(
    session: Session,
    State(learning): State<GuardedLearningManager>,
) -> ServiceResult<ApiResponse<Vec<EnrollmentOverview>>> {
    session.require(Permission::AccessCourses)?;
    Ok(ok(learning.user_enrollments(session.user_id)?))
}

/// PUT /courses/{id}/current-lecture
async fn set_current_lecture(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
    Json(body): Json<CurrentLectureBody>,
) -> ServiceResult<ApiResponse<Enrollment>> {
    session.require(Permission::EnrollCourses)?;
    Ok(ok(learning.set_current_lecture(
        session.user_id,
        &course_id,
        body.lecture_index,
    )?))
}

/// POST /courses/{id}/lectures/{index}/complete
async fn complete_lecture(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path((course_id, lecture_index)): Path<(String, usize)>,
) -> ServiceResult<ApiResponse<CourseProgress>> {
    session.require(Permission::EnrollCourses)?;
    Ok(ok(learning.complete_lecture(
        session.user_id,
        &course_id,
        lecture_index,
    )?))
}

/// GET /courses/{id}/lectures/{index}/quiz
async fn quiz_history(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path((course_id, lecture_index)): Path<(String, usize)>,
) -> ServiceResult<ApiResponse<Vec<QuizAttempt>>> {
    session.require(Permission::AccessCourses)?;
    Ok(ok(learning.quiz_history(
        session.user_id,
        &course_id,
        lecture_index,
    )?))
}

/// POST /courses/{id}/lectures/{index}/quiz
async fn record_quiz_attempt(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path((course_id, lecture_index)): Path<(String, usize)>,
    Json(result): Json<QuizResult>,
) -> ServiceResult<ApiResponse<QuizAttemptOutcome>> {
    session.require(Permission::EnrollCourses)?;
    Ok(created(learning.record_quiz_attempt(
        session.user_id,
        &course_id,
        lecture_index,
        result,
    )?))
}

/// GET /courses/{id}/progress
async fn get_progress(
    session: Session,
    State(learning): State<GuardedLearningManager>,
    Path(course_id): Path<String>,
) -> ServiceResult<ApiResponse<CourseProgress>> {
    session.require(Permission::AccessCourses)?;
    Ok(ok(learning.get_progress(session.user_id, &course_id)?))
}

pub fn learning_routes() -> Router<ServerState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/{id}/enroll", post(enroll).delete(unenroll))
        .route("/courses/{id}/current-lecture", put(set_current_lecture))
        .route(
            "/courses/{id}/lectures/{index}/complete",
            post(complete_lecture),
        )
        .route(
            "/courses/{id}/lectures/{index}/quiz",
            get(quiz_history).post(record_quiz_attempt),
        )
        .route("/courses/{id}/progress", get(get_progress))
        .route("/enrollments", get(my_enrollments))
}
