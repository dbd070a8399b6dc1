use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use calbook_api::handlers::time_slot::parse_date;
use calbook_api::middleware::error_handling::AppError;
use calbook_core::conflict;
use calbook_core::errors::CalendarError;
use calbook_core::models::time_slot::{SlotWindow, TimeSlotResponse, UpdateTimeSlotRequest};
use calbook_db::models::{DbSlotWithBooking, DbUser};

use crate::test_utils::{at, booked_slot, test_user, unbooked_slot, TestContext};

// Mirrors the listing handler's projection: availability from the booking
// join, can_book from the conflict engine for the requesting user.
fn response_for(
    slot: DbSlotWithBooking,
    user: &DbUser,
    held: &[SlotWindow],
    now: DateTime<Utc>,
) -> TimeSlotResponse {
    let window = SlotWindow {
        id: slot.id,
        category_id: slot.category_id,
        start_time: slot.start_time,
        end_time: slot.end_time,
    };
    let can_book = conflict::can_book_slot(now, user.id, &window, slot.booked_by_id, held).is_ok();

    TimeSlotResponse {
        id: slot.id,
        category_id: slot.category_id,
        category_name: slot.category_name,
        start_time: slot.start_time,
        end_time: slot.end_time,
        is_booked: slot.booking_id.is_some(),
        booked_by: slot.booked_by_username,
        can_book,
        created_at: slot.created_at,
    }
}

#[test]
fn test_date_parsing() {
    assert!(parse_date("2030-06-01").is_ok());

    let error = parse_date("01/06/2030").expect_err("slash format should fail");
    assert_eq!(
        error.0.to_string(),
        "Validation error: Invalid date format. Use YYYY-MM-DD"
    );
    assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);

    assert!(parse_date("2030-13-99").is_err());
}

#[test]
fn test_unbooked_slot_is_available_to_everyone() {
    let user = test_user("alice", false);
    let slot = unbooked_slot(at(10, 0), at(11, 0));

    let response = response_for(slot, &user, &[], at(8, 0));

    assert!(!response.is_booked);
    assert_eq!(response.booked_by, None);
    assert!(response.can_book);
}

#[test]
fn test_booked_slot_reports_holder_and_blocks_booking() {
    let user = test_user("alice", false);
    let holder = test_user("bob", false);
    let slot = booked_slot(at(10, 0), at(11, 0), &holder);

    let response = response_for(slot, &user, &[], at(8, 0));

    assert!(response.is_booked);
    assert_eq!(response.booked_by, Some("bob".to_string()));
    assert!(!response.can_book);
}

#[test]
fn test_can_book_reflects_callers_own_holdings() {
    let user = test_user("alice", false);
    // User holds 10:00-11:00 somewhere; the overlapping 10:30-11:30 slot is
    // not bookable for them, the adjacent 11:00-12:00 slot is
    let held = vec![SlotWindow {
        id: Uuid::new_v4(),
        category_id: Uuid::new_v4(),
        start_time: at(10, 0),
        end_time: at(11, 0),
    }];

    let overlapping = response_for(unbooked_slot(at(10, 30), at(11, 30)), &user, &held, at(8, 0));
    let adjacent = response_for(unbooked_slot(at(11, 0), at(12, 0)), &user, &held, at(8, 0));

    assert!(!overlapping.can_book);
    assert!(adjacent.can_book);
}

#[test]
fn test_past_slot_is_not_bookable() {
    let user = test_user("alice", false);
    let slot = unbooked_slot(at(10, 0), at(11, 0));

    let response = response_for(slot, &user, &[], at(12, 0));

    assert!(!response.is_booked);
    assert!(!response.can_book);
}

#[tokio::test]
async fn test_booked_slot_scheduling_update_is_rejected() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();
    let changes = UpdateTimeSlotRequest {
        category_id: None,
        start_time: Some(at(14, 0)),
        end_time: Some(at(15, 0)),
    };

    // The repository transaction detects the booking and refuses the change
    ctx.time_slot_repo
        .expect_update_time_slot()
        .with(predicate::eq(slot_id), predicate::always())
        .returning(|_, _| {
            Err(CalendarError::Conflict(
                "Cannot modify time or category of booked slot".to_string(),
            ))
        });

    let error = ctx
        .time_slot_repo
        .update_time_slot(slot_id, changes)
        .await
        .map_err(AppError::from)
        .expect_err("frozen slot should reject the update");

    assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booked_slot_delete_is_rejected() {
    let mut ctx = TestContext::new();
    let slot_id = Uuid::new_v4();

    ctx.time_slot_repo
        .expect_delete_time_slot()
        .with(predicate::eq(slot_id))
        .returning(|_| {
            Err(CalendarError::Conflict(
                "Cannot delete booked time slot".to_string(),
            ))
        });

    let error = ctx
        .time_slot_repo
        .delete_time_slot(slot_id)
        .await
        .map_err(AppError::from)
        .expect_err("booked slot should not be deletable");

    assert_eq!(error.0.to_string(), "Cannot delete booked time slot");
    assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
}
