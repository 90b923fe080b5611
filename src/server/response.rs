//! JSON envelope shared by every API route.
//!
//! Successful calls answer `{"success": true, "data": ...}`; failures answer
//! `{"success": false, "message": ..., "errors": [...]}` with the status code
//! derived from the [`ServiceError`] variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{FieldError, ServiceError};

#[derive(Serialize)]
struct SuccessBody<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

/// Attached to error responses so the request logger can count them per route.
#[derive(Debug, Clone, Copy)]
pub struct ErrorKind(pub &'static str);

pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

pub fn ok<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        status: StatusCode::OK,
        data,
    }
}

pub fn created<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        status: StatusCode::CREATED,
        data,
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(SuccessBody {
                success: true,
                data: self.data,
            }),
        )
            .into_response()
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            message: message.into(),
            errors: None,
        }),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, body) = match self {
            ServiceError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    success: false,
                    message: "Validation failed".to_string(),
                    errors: Some(errors),
                },
            ),
            ServiceError::Storage(err) => {
                error!("Storage error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        success: false,
                        message: "Internal server error".to_string(),
                        errors: None,
                    },
                )
            }
            other => {
                let status = match other {
                    ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                    ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                debug!("Request failed with {}: {}", status, other);
                (
                    status,
                    ErrorBody {
                        success: false,
                        message: other.to_string(),
                        errors: None,
                    },
                )
            }
        };
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(ErrorKind(kind));
        response
    }
}
