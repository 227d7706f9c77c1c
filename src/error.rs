use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Database(sqlx::Error),
    Internal(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    /// Storage retries exhausted. Distinct from the domain errors below so
    /// a transient failure is never read as a business-rule violation.
    ServiceUnavailable,
    // Pairing
    AlreadyInSpace,
    SpaceFull,
    InvalidCode,
    SelfJoin,
    // Unbind lifecycle
    NotPaired,
    AlreadyPending,
    NoPendingRequest,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "internal_error",
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "already_exists",
            AppError::ServiceUnavailable => "service_unavailable",
            AppError::AlreadyInSpace => "already_in_space",
            AppError::SpaceFull => "space_full",
            AppError::InvalidCode => "invalid_code",
            AppError::SelfJoin => "self_join",
            AppError::NotPaired => "not_paired",
            AppError::AlreadyPending => "already_pending",
            AppError::NoPendingRequest => "no_pending_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AlreadyInSpace => StatusCode::CONFLICT,
            AppError::SpaceFull => StatusCode::CONFLICT,
            AppError::InvalidCode => StatusCode::NOT_FOUND,
            AppError::SelfJoin => StatusCode::BAD_REQUEST,
            AppError::NotPaired => StatusCode::BAD_REQUEST,
            AppError::AlreadyPending => StatusCode::CONFLICT,
            AppError::NoPendingRequest => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                "internal database error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "internal server error".to_string()
            }
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::ServiceUnavailable => {
                "the service is temporarily unavailable, try again".to_string()
            }
            AppError::AlreadyInSpace => "you are already in a space".to_string(),
            // SpaceFull and InvalidCode share one generic message: telling
            // the loser of a join race that someone else got there first
            // would leak the third party's existence.
            AppError::SpaceFull => "this connection is no longer available".to_string(),
            AppError::InvalidCode => "this connection is no longer available".to_string(),
            AppError::SelfJoin => "you cannot pair with yourself".to_string(),
            AppError::NotPaired => "the space does not have two partners".to_string(),
            AppError::AlreadyPending => "an unbind request is already pending".to_string(),
            AppError::NoPendingRequest => "no pending unbind request".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message()
            }
        });

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::NotFound("resource not found".to_string()),
            _ => AppError::Database(e),
        }
    }
}
