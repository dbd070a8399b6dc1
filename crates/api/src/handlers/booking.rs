use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use calbook_core::{
    conflict::{self, Actor},
    errors::CalendarError,
    models::{
        booking::{BookedSlotInfo, BookingStatusFilter, CreateBookingRequest, UserBookingResponse},
        event::{BookingEventPayload, CalendarEvent, SlotEventPayload},
        time_slot::SlotWindow,
        user::UserRef,
    },
};
use calbook_db::models::DbBookingDetail;
use calbook_db::repositories;
use uuid::Uuid;

use crate::{
    middleware::{auth::AuthUser, error_handling::AppError},
    ApiState,
};

#[derive(Debug, Deserialize)]
pub struct UserBookingsQuery {
    pub status: Option<String>,
}

/// Event snapshot for a booking, built from the joined detail row. Captured
/// before deletion for cancellations, since the row is gone afterwards.
pub(crate) fn booking_event_payload(detail: &DbBookingDetail) -> BookingEventPayload {
    BookingEventPayload {
        id: detail.id,
        user: UserRef {
            id: detail.user_id,
            username: detail.username.clone(),
        },
        time_slot: SlotEventPayload {
            id: detail.time_slot_id,
            category_id: detail.category_id,
            category_name: detail.category_name.clone(),
            start_time: detail.start_time,
            end_time: detail.end_time,
        },
    }
}

fn user_booking_response(detail: DbBookingDetail, can_cancel: bool) -> UserBookingResponse {
    UserBookingResponse {
        id: detail.id,
        time_slot: BookedSlotInfo {
            id: detail.time_slot_id,
            category_id: detail.category_id,
            category_name: detail.category_name,
            start_time: detail.start_time,
            end_time: detail.end_time,
        },
        booked_at: detail.booked_at,
        can_cancel,
    }
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<UserBookingResponse>), AppError> {
    let now = Utc::now();

    // Advisory pre-check over a plain read, for a precise denial reason
    // before any locks are taken.
    let slot = repositories::time_slot::get_slot_with_booking(&state.db_pool, payload.time_slot_id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| {
            CalendarError::NotFound(format!("Time slot {} not found", payload.time_slot_id))
        })?;

    let held = repositories::time_slot::user_booked_windows(&state.db_pool, user.id)
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

    // Authoritative write: the repository re-checks under a row lock and the
    // storage uniqueness constraint settles any remaining race.
    let booking =
        repositories::booking::create_booking(&state.db_pool, payload.time_slot_id, user.id)
            .await?;

    let response = UserBookingResponse {
        id: booking.id,
        time_slot: BookedSlotInfo {
            id: slot.id,
            category_id: slot.category_id,
            category_name: slot.category_name.clone(),
            start_time: slot.start_time,
            end_time: slot.end_time,
        },
        booked_at: booking.booked_at,
        can_cancel: conflict::can_cancel_booking(
            now,
            &Actor {
                id: user.id,
                is_staff: false,
            },
            user.id,
            slot.start_time,
        )
        .is_ok(),
    };

    // Post-commit notification; a publish failure never affects the booking
    state.events.publish(CalendarEvent::BookingCreated(BookingEventPayload {
        id: booking.id,
        user: UserRef {
            id: user.id,
            username: user.username.clone(),
        },
        time_slot: SlotEventPayload {
            id: slot.id,
            category_id: slot.category_id,
            category_name: slot.category_name,
            start_time: slot.start_time,
            end_time: slot.end_time,
        },
    }));

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let now = Utc::now();

    let detail = repositories::booking::get_booking_detail(&state.db_pool, id)
        .await
        .map_err(CalendarError::Database)?;

    // Non-owners get the same 404 as a missing booking, so this endpoint
    // never confirms another user's booking exists.
    let detail = match detail {
        Some(detail) if detail.user_id == user.id => detail,
        _ => {
            return Err(AppError(CalendarError::NotFound(
                "Booking not found".to_string(),
            )))
        }
    };

    // The self-service cutoff applies to everyone here; staff bypass it
    // only through the admin endpoint.
    let actor = Actor {
        id: user.id,
        is_staff: false,
    };
    conflict::can_cancel_booking(now, &actor, detail.user_id, detail.start_time)
        .map_err(CalendarError::from)?;

    let payload = booking_event_payload(&detail);
    repositories::booking::delete_booking(&state.db_pool, id).await?;

    state.events.publish(CalendarEvent::BookingCancelled(payload));

    Ok(Json(
        serde_json::json!({ "message": "Booking cancelled successfully" }),
    ))
}

#[axum::debug_handler]
pub async fn list_user_bookings(
    State(state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<UserBookingsQuery>,
) -> Result<Json<Vec<UserBookingResponse>>, AppError> {
    let now = Utc::now();

    let status = match query.status.as_deref() {
        Some("upcoming") => Some(BookingStatusFilter::Upcoming),
        Some("past") => Some(BookingStatusFilter::Past),
        _ => None,
    };

    let bookings = repositories::booking::list_user_bookings(&state.db_pool, user.id, status, now)
        .await
        .map_err(CalendarError::Database)?;

    let actor = Actor {
        id: user.id,
        is_staff: false,
    };
    let response = bookings
        .into_iter()
        .map(|detail| {
            let can_cancel =
                conflict::can_cancel_booking(now, &actor, detail.user_id, detail.start_time)
                    .is_ok();
            user_booking_response(detail, can_cancel)
        })
        .collect();

    Ok(Json(response))
}
