use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use mockall::predicate;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use calbook_core::conflict::{self, Actor};
use calbook_core::errors::CalendarError;
use calbook_core::models::booking::{BookedSlotInfo, UserBookingResponse};
use calbook_core::models::time_slot::SlotWindow;
use calbook_db::models::{DbBooking, DbUser};

use crate::test_utils::{at, booked_slot, booking_detail, test_user, unbooked_slot, TestContext};
use calbook_api::middleware::error_handling::AppError;

// Test wrappers mirroring the handler decision flow against mocked
// repositories: advisory conflict check over current state, then the
// repository write, which owns the transactional re-check in production.

async fn test_create_booking_wrapper(
    ctx: &mut TestContext,
    user: &DbUser,
    slot_id: Uuid,
    now: DateTime<Utc>,
) -> Result<UserBookingResponse, AppError> {
    let slot = ctx
        .time_slot_repo
        .get_slot_with_booking(slot_id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| AppError(CalendarError::NotFound(format!("Time slot {slot_id} not found"))))?;

    let held = ctx
        .time_slot_repo
        .user_booked_windows(user.id)
        .await
        .map_err(CalendarError::Database)?;

    let window = SlotWindow {
        id: slot.id,
        category_id: slot.category_id,
        start_time: slot.start_time,
        end_time: slot.end_time,
    };
    conflict::can_book_slot(now, user.id, &window, slot.booked_by_id, &held)
        .map_err(CalendarError::from)?;

    let booking = ctx.booking_repo.create_booking(slot_id, user.id).await?;

    Ok(UserBookingResponse {
        id: booking.id,
        time_slot: BookedSlotInfo {
            id: slot.id,
            category_id: slot.category_id,
            category_name: slot.category_name,
            start_time: slot.start_time,
            end_time: slot.end_time,
        },
        booked_at: booking.booked_at,
        can_cancel: slot.start_time > now,
    })
}

async fn test_cancel_booking_wrapper(
    ctx: &mut TestContext,
    user: &DbUser,
    booking_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let detail = ctx
        .booking_repo
        .get_booking_detail(booking_id)
        .await
        .map_err(CalendarError::Database)?;

    // Non-owners see the same 404 as a missing booking
    let detail = match detail {
        Some(detail) if detail.user_id == user.id => detail,
        _ => return Err(AppError(CalendarError::NotFound("Booking not found".to_string()))),
    };

    let actor = Actor {
        id: user.id,
        is_staff: false,
    };
    conflict::can_cancel_booking(now, &actor, detail.user_id, detail.start_time)
        .map_err(CalendarError::from)?;

    ctx.booking_repo.delete_booking(booking_id).await?;
    Ok(())
}

async fn test_admin_cancel_wrapper(
    ctx: &mut TestContext,
    booking_id: Uuid,
) -> Result<StatusCode, AppError> {
    ctx.booking_repo
        .get_booking_detail(booking_id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| AppError(CalendarError::NotFound(format!("Booking {booking_id} not found"))))?;

    ctx.booking_repo.delete_booking(booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tokio::test]
async fn test_create_booking_success() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let now = at(8, 0);
    let slot = unbooked_slot(at(10, 0), at(11, 0));
    let slot_id = slot.id;
    let booking_id = Uuid::new_v4();

    ctx.time_slot_repo
        .expect_get_slot_with_booking()
        .with(predicate::eq(slot_id))
        .returning(move |_| Ok(Some(slot.clone())));
    ctx.time_slot_repo
        .expect_user_booked_windows()
        .with(predicate::eq(user.id))
        .returning(|_| Ok(vec![]));
    let expected_user = user.id;
    ctx.booking_repo
        .expect_create_booking()
        .with(predicate::eq(slot_id), predicate::eq(expected_user))
        .times(1)
        .returning(move |time_slot_id, user_id| {
            Ok(DbBooking {
                id: booking_id,
                time_slot_id,
                user_id,
                booked_at: at(8, 1),
            })
        });

    let response = test_create_booking_wrapper(&mut ctx, &user, slot_id, now)
        .await
        .expect("booking should succeed");

    assert_eq!(response.id, booking_id);
    assert_eq!(response.time_slot.id, slot_id);
    assert!(response.can_cancel);
}

#[tokio::test]
async fn test_create_booking_denied_when_already_booked() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let other = test_user("bob", false);
    let now = at(8, 0);
    let slot = booked_slot(at(10, 0), at(11, 0), &other);
    let slot_id = slot.id;

    ctx.time_slot_repo
        .expect_get_slot_with_booking()
        .returning(move |_| Ok(Some(slot.clone())));
    ctx.time_slot_repo
        .expect_user_booked_windows()
        .returning(|_| Ok(vec![]));
    // No create_booking expectation: reaching the repository would panic

    let error = test_create_booking_wrapper(&mut ctx, &user, slot_id, now)
        .await
        .expect_err("booking should be denied");

    assert_eq!(
        error.0.to_string(),
        "This slot is already booked by another user"
    );
    assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_booking_denied_for_past_slot() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let now = at(12, 0);
    let slot = unbooked_slot(at(10, 0), at(11, 0));
    let slot_id = slot.id;

    ctx.time_slot_repo
        .expect_get_slot_with_booking()
        .returning(move |_| Ok(Some(slot.clone())));
    ctx.time_slot_repo
        .expect_user_booked_windows()
        .returning(|_| Ok(vec![]));

    let error = test_create_booking_wrapper(&mut ctx, &user, slot_id, now)
        .await
        .expect_err("past slot should be denied");

    assert_eq!(error.0.to_string(), "Time slot is in the past");
}

#[tokio::test]
async fn test_create_booking_denied_on_cross_category_overlap() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let now = at(8, 0);
    // Target slot is in another category than the held booking; the
    // self-overlap rule still applies
    let slot = unbooked_slot(at(10, 30), at(11, 30));
    let slot_id = slot.id;
    let held = SlotWindow {
        id: Uuid::new_v4(),
        category_id: Uuid::new_v4(),
        start_time: at(10, 0),
        end_time: at(11, 0),
    };

    ctx.time_slot_repo
        .expect_get_slot_with_booking()
        .returning(move |_| Ok(Some(slot.clone())));
    ctx.time_slot_repo
        .expect_user_booked_windows()
        .returning(move |_| Ok(vec![held]));

    let error = test_create_booking_wrapper(&mut ctx, &user, slot_id, now)
        .await
        .expect_err("overlapping booking should be denied");

    assert_eq!(
        error.0.to_string(),
        "You have a conflicting booking at this time"
    );
}

#[tokio::test]
async fn test_concurrent_loser_gets_domain_conflict_not_server_error() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let now = at(8, 0);
    let slot = unbooked_slot(at(10, 0), at(11, 0));
    let slot_id = slot.id;

    // Pre-check sees a free slot, but the transactional write loses the
    // race and reports the translated unique-constraint violation
    ctx.time_slot_repo
        .expect_get_slot_with_booking()
        .returning(move |_| Ok(Some(slot.clone())));
    ctx.time_slot_repo
        .expect_user_booked_windows()
        .returning(|_| Ok(vec![]));
    ctx.booking_repo
        .expect_create_booking()
        .returning(|_, _| {
            Err(CalendarError::Conflict(
                "This slot is already booked by another user".to_string(),
            ))
        });

    let error = test_create_booking_wrapper(&mut ctx, &user, slot_id, now)
        .await
        .expect_err("loser should get a conflict");

    assert!(matches!(error.0, CalendarError::Conflict(_)));
    assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_booking_not_owner_is_not_found() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let owner = test_user("bob", false);
    let detail = booking_detail(&owner, at(10, 0), at(11, 0));
    let booking_id = detail.id;

    ctx.booking_repo
        .expect_get_booking_detail()
        .with(predicate::eq(booking_id))
        .returning(move |_| Ok(Some(detail.clone())));

    let error = test_cancel_booking_wrapper(&mut ctx, &user, booking_id, at(8, 0))
        .await
        .expect_err("foreign booking should look missing");

    assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_booking_after_start_is_denied() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let detail = booking_detail(&user, at(10, 0), at(11, 0));
    let booking_id = detail.id;

    ctx.booking_repo
        .expect_get_booking_detail()
        .returning(move |_| Ok(Some(detail.clone())));

    let error = test_cancel_booking_wrapper(&mut ctx, &user, booking_id, at(10, 30))
        .await
        .expect_err("cutoff should block the owner");

    assert_eq!(
        error.0.to_string(),
        "Cannot cancel a booking after the time slot has started"
    );
    assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_booking_success_before_start() {
    let mut ctx = TestContext::new();
    let user = test_user("alice", false);
    let detail = booking_detail(&user, at(10, 0), at(11, 0));
    let booking_id = detail.id;

    ctx.booking_repo
        .expect_get_booking_detail()
        .returning(move |_| Ok(Some(detail.clone())));
    ctx.booking_repo
        .expect_delete_booking()
        .with(predicate::eq(booking_id))
        .times(1)
        .returning(|_| Ok(()));

    test_cancel_booking_wrapper(&mut ctx, &user, booking_id, at(9, 0))
        .await
        .expect("owner cancellation before start should succeed");
}

#[tokio::test]
async fn test_admin_cancels_past_booking_of_another_user() {
    let mut ctx = TestContext::new();
    let owner = test_user("bob", false);
    // Slot already started; the owner could no longer self-cancel
    let detail = booking_detail(&owner, at(10, 0), at(11, 0));
    let booking_id = detail.id;

    ctx.booking_repo
        .expect_get_booking_detail()
        .returning(move |_| Ok(Some(detail.clone())));
    ctx.booking_repo
        .expect_delete_booking()
        .times(1)
        .returning(|_| Ok(()));

    let status = test_admin_cancel_wrapper(&mut ctx, booking_id)
        .await
        .expect("admin cancellation should bypass the cutoff");

    assert_eq!(status, StatusCode::NO_CONTENT);
}
