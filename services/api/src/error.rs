//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use tracking::TrackingError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed or expired bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Login attempts exceeded the rate limit
    #[error("Too many login attempts, try again later")]
    TooManyRequests,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Kiosk state storage failure
    #[error("Cache error: {0}")]
    Cache(#[from] common::error::CacheError),

    /// Domain error raised by the tracking core
    #[error(transparent)]
    Tracking(#[from] TrackingError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError | ApiError::Cache(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Tracking(e) => match e {
                TrackingError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                TrackingError::Forbidden
                | TrackingError::ManualSelectionNotAllowed
                | TrackingError::ProjectNotInCostCenter => StatusCode::FORBIDDEN,
                TrackingError::UnknownOrBlockedUser
                | TrackingError::UnknownProject
                | TrackingError::NotFound(_)
                | TrackingError::NoActiveSession => StatusCode::NOT_FOUND,
                TrackingError::SessionAlreadyActive
                | TrackingError::DuplicateUsername
                | TrackingError::ProjectClosed
                | TrackingError::LoginRequired => StatusCode::CONFLICT,
                TrackingError::UnrecognizedQrFormat | TrackingError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                TrackingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::TooManyRequests => "too_many_requests",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::InternalServerError | ApiError::Cache(_) => "internal_error",
            ApiError::Tracking(e) => e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::error::DatabaseError;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let cases = [
            (TrackingError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (TrackingError::Forbidden, StatusCode::FORBIDDEN),
            (TrackingError::UnknownOrBlockedUser, StatusCode::NOT_FOUND),
            (TrackingError::NoActiveSession, StatusCode::NOT_FOUND),
            (TrackingError::SessionAlreadyActive, StatusCode::CONFLICT),
            (TrackingError::ProjectClosed, StatusCode::CONFLICT),
            (TrackingError::UnrecognizedQrFormat, StatusCode::BAD_REQUEST),
            (
                TrackingError::Validation("Name is required".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TrackingError::Database(DatabaseError::Configuration("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status(), expected);
        }
    }

    #[test]
    fn test_codes_come_from_the_domain_error() {
        assert_eq!(
            ApiError::from(TrackingError::SessionAlreadyActive).code(),
            "session_already_active"
        );
        assert_eq!(ApiError::TooManyRequests.code(), "too_many_requests");
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = ApiError::from(TrackingError::UnknownProject).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::TooManyRequests.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
