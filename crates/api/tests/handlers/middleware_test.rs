use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use pretty_assertions::assert_eq;
use rstest::rstest;

use calbook_api::middleware::error_handling::AppError;
use calbook_core::errors::CalendarError;

#[rstest]
#[case(CalendarError::NotFound("Booking not found".to_string()), StatusCode::NOT_FOUND)]
#[case(CalendarError::Validation("Invalid date".to_string()), StatusCode::BAD_REQUEST)]
#[case(CalendarError::Conflict("Time slot is in the past".to_string()), StatusCode::BAD_REQUEST)]
#[case(CalendarError::Authentication("Invalid token".to_string()), StatusCode::UNAUTHORIZED)]
#[case(CalendarError::Authorization("Admin access required".to_string()), StatusCode::FORBIDDEN)]
#[case(CalendarError::Database(eyre::eyre!("pool exhausted")), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_error_status_mapping(#[case] error: CalendarError, #[case] expected: StatusCode) {
    let response = AppError(error).into_response();
    assert_eq!(response.status(), expected);
}

#[tokio::test]
async fn test_conflict_reason_is_surfaced_verbatim() {
    let error = AppError(CalendarError::Conflict(
        "You have a conflicting booking at this time".to_string(),
    ));

    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "error": "You have a conflicting booking at this time" })
    );
}

#[tokio::test]
async fn test_database_errors_do_not_leak_detail() {
    let error = AppError(CalendarError::Database(eyre::eyre!(
        "connection refused at 10.0.0.3:5432"
    )));

    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
}
