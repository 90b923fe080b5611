use super::response::error_response;
use super::state::ServerState;
use crate::error::{ServiceError, ServiceResult};
use crate::user::auth::AuthTokenValue;
use crate::user::{resolve_permissions, Actor, Permission, UserRole};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

/// The authenticated caller, resolved server-side from the session token.
#[derive(Debug)]
pub struct Session {
    pub user_id: usize,
    pub token: String,
    pub role: UserRole,
    pub blocked: bool,
    pub permissions: Vec<Permission>,
    /// Childlock password presented with the request, if any.
    pub childlock: Option<String>,
}

impl Session {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> ServiceResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else if self.blocked {
            Err(ServiceError::forbidden("This account is blocked"))
        } else {
            Err(ServiceError::forbidden(format!(
                "Missing permission {:?}",
                permission
            )))
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";
pub const HEADER_CHILDLOCK_KEY: &str = "X-Childlock";

pub enum SessionExtractionError {
    AccessDenied,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => {
                error_response(StatusCode::UNAUTHORIZED, "Authentication required")
            }
            SessionExtractionError::InternalError => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    let jar = CookieJar::from_request_parts(parts, ctx).await.ok()?;
    jar.get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_header(parts: &Parts, key: &str) -> Option<String> {
    parts
        .headers
        .get(key)
        .map(|v| v.as_bytes().to_owned())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .filter(|v| !v.is_empty())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Result<Option<Session>, SessionExtractionError> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_header(parts, HEADER_SESSION_TOKEN_KEY))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return Ok(None);
        }
        Some(x) => x,
    };

    let auth_token_value = AuthTokenValue(token);
    let auth_token = match ctx.user_manager.get_auth_token(&auth_token_value) {
        Ok(Some(token)) => token,
        Ok(None) => {
            debug!("Auth token not found in database");
            return Ok(None);
        }
        Err(e) => {
            debug!("Failed to get auth token from database: {}", e);
            return Err(SessionExtractionError::InternalError);
        }
    };

    if let Err(e) = ctx.user_manager.touch_auth_token(&auth_token_value) {
        // Authentication still succeeds, the token only ages faster.
        debug!("Failed to update auth token last_used timestamp: {}", e);
    }

    let user = match ctx.user_manager.find_user(auth_token.user_id) {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(None),
        Err(e) => {
            debug!("Failed to load user {}: {}", auth_token.user_id, e);
            return Err(SessionExtractionError::InternalError);
        }
    };

    Ok(Some(Session {
        user_id: user.id,
        token: auth_token.value.0,
        role: user.role,
        blocked: user.blocked,
        permissions: resolve_permissions(user.role, user.blocked),
        childlock: extract_header(parts, HEADER_CHILDLOCK_KEY),
    }))
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await?
            .ok_or(SessionExtractionError::AccessDenied)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx).await
    }
}
