//! # Error Handling Middleware
//!
//! This module provides a standardized way to handle errors in the Calbook
//! API. It maps domain-specific errors to appropriate HTTP status codes and
//! JSON error responses, ensuring a consistent error handling experience
//! across the entire API.
//!
//! Domain conflicts (overlaps, double bookings, cancellation cutoffs) map to
//! 400 with the conflict engine's reason in the body; unexpected failures map
//! to 500 with a generic message so internal detail is never leaked.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use calbook_core::errors::CalendarError;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps domain-specific `CalendarError` instances and implements
/// `IntoResponse` to convert them into HTTP responses with appropriate
/// status codes and JSON payloads.
#[derive(Debug)]
pub struct AppError(pub CalendarError);

/// Converts application errors to HTTP responses
///
/// This implementation maps each error type to the appropriate HTTP status
/// code and formats the error message into a JSON response body.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map error types to HTTP status codes
        let status = match &self.0 {
            CalendarError::NotFound(_) => StatusCode::NOT_FOUND,
            CalendarError::Validation(_) => StatusCode::BAD_REQUEST,
            CalendarError::Conflict(_) => StatusCode::BAD_REQUEST,
            CalendarError::Authentication(_) => StatusCode::UNAUTHORIZED,
            CalendarError::Authorization(_) => StatusCode::FORBIDDEN,
            CalendarError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CalendarError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Never leak internal detail for unexpected failures
        let message = match &self.0 {
            CalendarError::Database(report) => {
                tracing::error!("Database error: {:?}", report);
                "Internal server error".to_string()
            }
            CalendarError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message }));

        // Combine status code and JSON body into a response
        (status, body).into_response()
    }
}

/// Automatic conversion from CalendarError to AppError
///
/// This implementation allows using the `?` operator with functions that
/// return `Result<T, CalendarError>` in handler functions that return
/// `Result<T, AppError>`.
impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// Wraps the eyre error in a CalendarError::Database variant so plain
/// repository results also work with the `?` operator.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(CalendarError::Database(err))
    }
}
