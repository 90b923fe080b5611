//! Registration, login/logout and profile routes
//!
//! Mounted under `/api/auth` and `/api/users`.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::metrics::record_login_attempt;
use super::response::{created, ok, ApiResponse};
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::error::{ServiceError, ServiceResult};
use crate::user::auth::AuthTokenValue;
use crate::user::{Permission, PublicProfile, RegisterRequest, User, UserRole};

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    pub handle: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginSuccessResponse {
    token: String,
    user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_id: usize,
    handle: String,
    role: UserRole,
    blocked: bool,
    permissions: Vec<Permission>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<RegisterRequest>,
) -> ServiceResult<ApiResponse<User>> {
    let user = user_manager.register(body)?;
    info!("Registered user {} ({})", user.handle, user.role);
    Ok(created(user))
}

/// POST /api/auth/login
async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> ServiceResult<Response> {
    debug!("login() called for {}", body.handle);
    let start = Instant::now();
    let (token, user) = match user_manager.login(&body.handle, &body.password) {
        Ok(result) => result,
        Err(err) => {
            record_login_attempt("failure", start.elapsed());
            return Err(err);
        }
    };
    record_login_attempt("success", start.elapsed());

    let cookie_value = HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly",
        COOKIE_SESSION_TOKEN_KEY, token.value.0
    ))
    .map_err(|err| ServiceError::Storage(err.into()))?;
    let mut response = created(LoginSuccessResponse {
        token: token.value.0,
        user,
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, cookie_value);
    Ok(response)
}

/// GET /api/auth/logout
async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ServiceResult<Response> {
    user_manager
        .delete_auth_token(session.user_id, &AuthTokenValue(session.token))
        .map_err(|err| ServiceError::bad_request(err.to_string()))?;

    let cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();
    let mut response = ok(()).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// GET /api/auth/session
async fn get_session(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ServiceResult<ApiResponse<SessionResponse>> {
    let user = user_manager.get_user(session.user_id)?;
    Ok(ok(SessionResponse {
        user_id: user.id,
        handle: user.handle,
        role: session.role,
        blocked: session.blocked,
        permissions: session.permissions,
    }))
}

/// GET /api/users/me
async fn get_me(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ServiceResult<ApiResponse<User>> {
    Ok(ok(user_manager.get_user(session.user_id)?))
}

/// GET /api/users/{id}
async fn get_profile(
    State(user_manager): State<GuardedUserManager>,
    _session: Session,
    Path(user_id): Path<usize>,
) -> ServiceResult<ApiResponse<PublicProfile>> {
    Ok(ok(user_manager.get_user(user_id)?.public_profile()))
}

pub fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
}

pub fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/{id}", get(get_profile))
}
