use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use calbook_core::{
    conflict::{self, Actor},
    errors::CalendarError,
    models::{
        booking::{AdminBookingResponse, AdminBookingUserInfo, BookedSlotInfo},
        event::{CalendarEvent, SlotEventPayload},
        time_slot::{
            AdminTimeSlotResponse, CreateTimeSlotRequest, SlotBookingInfo, UpdateTimeSlotRequest,
        },
    },
};
use calbook_db::models::{DbBookingDetail, DbSlotWithBooking, DbTimeSlot};
use calbook_db::repositories::{
    self,
    booking::BookingFilter,
    time_slot::{SlotAvailability, SlotFilter},
};
use uuid::Uuid;

use crate::{
    handlers::booking::booking_event_payload,
    handlers::time_slot::parse_date,
    middleware::{auth::AdminUser, error_handling::AppError},
    ApiState,
};

#[derive(Debug, Deserialize)]
pub struct AdminTimeSlotsQuery {
    pub date: Option<String>,
    pub category: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminBookingsQuery {
    pub date: Option<String>,
    pub user: Option<String>,
    pub category: Option<Uuid>,
    pub limit: Option<i64>,
}

/// The owner-perspective cancellability flag embedded in admin views.
fn owner_can_cancel(detail_user: Uuid, start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let owner = Actor {
        id: detail_user,
        is_staff: false,
    };
    conflict::can_cancel_booking(now, &owner, detail_user, start_time).is_ok()
}

fn admin_slot_response(slot: DbSlotWithBooking, now: DateTime<Utc>) -> AdminTimeSlotResponse {
    let booking_info = match (
        slot.booking_id,
        slot.booked_by_id,
        &slot.booked_by_username,
        &slot.booked_by_email,
        slot.booked_at,
    ) {
        (Some(booking_id), Some(user_id), Some(username), Some(email), Some(booked_at)) => {
            Some(SlotBookingInfo {
                booking_id,
                user_id,
                username: username.clone(),
                user_email: email.clone(),
                booked_at,
                can_cancel: owner_can_cancel(user_id, slot.start_time, now),
            })
        }
        _ => None,
    };

    AdminTimeSlotResponse {
        id: slot.id,
        category_id: slot.category_id,
        category_name: slot.category_name,
        start_time: slot.start_time,
        end_time: slot.end_time,
        is_booked: booking_info.is_some(),
        booking_info,
        created_by: slot.created_by,
        created_by_username: slot.created_by_username,
        created_at: slot.created_at,
    }
}

fn admin_booking_response(detail: DbBookingDetail, now: DateTime<Utc>) -> AdminBookingResponse {
    let can_cancel = owner_can_cancel(detail.user_id, detail.start_time, now);
    AdminBookingResponse {
        id: detail.id,
        user_info: AdminBookingUserInfo {
            id: detail.user_id,
            username: detail.username,
            email: detail.email,
            is_staff: detail.user_is_staff,
        },
        time_slot_info: BookedSlotInfo {
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

async fn slot_event_payload(
    state: &ApiState,
    slot: &DbTimeSlot,
) -> Result<SlotEventPayload, AppError> {
    let category = repositories::category::get_category_by_id(&state.db_pool, slot.category_id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| {
            CalendarError::NotFound(format!("Category {} not found", slot.category_id))
        })?;

    Ok(SlotEventPayload {
        id: slot.id,
        category_id: slot.category_id,
        category_name: category.name,
        start_time: slot.start_time,
        end_time: slot.end_time,
    })
}

#[axum::debug_handler]
pub async fn list_timeslots(
    State(state): State<Arc<ApiState>>,
    _admin: AdminUser,
    Query(query): Query<AdminTimeSlotsQuery>,
) -> Result<Json<Vec<AdminTimeSlotResponse>>, AppError> {
    let mut filter = SlotFilter::default();

    if let Some(date) = &query.date {
        filter.date = Some(parse_date(date)?);
    }
    filter.category_id = query.category;
    filter.availability = match query.status.as_deref() {
        Some("booked") => Some(SlotAvailability::Booked),
        Some("available") => Some(SlotAvailability::Available),
        _ => None,
    };

    let slots = repositories::time_slot::list_slots(&state.db_pool, &filter)
        .await
        .map_err(CalendarError::Database)?;

    let now = Utc::now();
    let response = slots
        .into_iter()
        .map(|slot| admin_slot_response(slot, now))
        .collect();

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn create_timeslot(
    State(state): State<Arc<ApiState>>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateTimeSlotRequest>,
) -> Result<(StatusCode, Json<AdminTimeSlotResponse>), AppError> {
    // The repository runs the full conflict check inside its transaction
    let slot = repositories::time_slot::create_time_slot(
        &state.db_pool,
        payload.category_id,
        payload.start_time,
        payload.end_time,
        admin.id,
    )
    .await?;

    let event_payload = slot_event_payload(&state, &slot).await?;
    let response = AdminTimeSlotResponse {
        id: slot.id,
        category_id: slot.category_id,
        category_name: event_payload.category_name.clone(),
        start_time: slot.start_time,
        end_time: slot.end_time,
        is_booked: false,
        booking_info: None,
        created_by: admin.id,
        created_by_username: admin.username.clone(),
        created_at: slot.created_at,
    };

    state.events.publish(CalendarEvent::SlotCreated(event_payload));

    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn get_timeslot(
    State(state): State<Arc<ApiState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AdminTimeSlotResponse>, AppError> {
    let slot = repositories::time_slot::get_slot_with_booking(&state.db_pool, id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| CalendarError::NotFound(format!("Time slot {id} not found")))?;

    Ok(Json(admin_slot_response(slot, Utc::now())))
}

#[axum::debug_handler]
pub async fn update_timeslot(
    State(state): State<Arc<ApiState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTimeSlotRequest>,
) -> Result<Json<AdminTimeSlotResponse>, AppError> {
    // Booked-slot freeze and the overlap re-check both live in the
    // repository transaction.
    repositories::time_slot::update_time_slot(&state.db_pool, id, &payload).await?;

    let slot = repositories::time_slot::get_slot_with_booking(&state.db_pool, id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| CalendarError::NotFound(format!("Time slot {id} not found")))?;

    Ok(Json(admin_slot_response(slot, Utc::now())))
}

#[axum::debug_handler]
pub async fn delete_timeslot(
    State(state): State<Arc<ApiState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let slot = repositories::time_slot::delete_time_slot(&state.db_pool, id).await?;

    let payload = slot_event_payload(&state, &slot).await?;
    state.events.publish(CalendarEvent::SlotDeleted(payload));

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<Arc<ApiState>>,
    _admin: AdminUser,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<Vec<AdminBookingResponse>>, AppError> {
    let mut filter = BookingFilter {
        username_contains: query.user.clone(),
        category_id: query.category,
        limit: query.limit,
        ..Default::default()
    };
    if let Some(date) = &query.date {
        filter.date = Some(parse_date(date)?);
    }

    let bookings = repositories::booking::list_bookings(&state.db_pool, &filter)
        .await
        .map_err(CalendarError::Database)?;

    let now = Utc::now();
    let response = bookings
        .into_iter()
        .map(|detail| admin_booking_response(detail, now))
        .collect();

    Ok(Json(response))
}

/// Admins cancel any booking regardless of ownership or timing rules.
#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<ApiState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let detail = repositories::booking::get_booking_detail(&state.db_pool, id)
        .await
        .map_err(CalendarError::Database)?
        .ok_or_else(|| CalendarError::NotFound(format!("Booking {id} not found")))?;

    let payload = booking_event_payload(&detail);
    repositories::booking::delete_booking(&state.db_pool, id).await?;

    state.events.publish(CalendarEvent::BookingCancelled(payload));

    Ok(StatusCode::NO_CONTENT)
}
