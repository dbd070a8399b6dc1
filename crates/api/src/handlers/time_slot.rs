use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use calbook_core::{
    conflict,
    errors::CalendarError,
    models::time_slot::{SlotWindow, TimeSlotResponse},
};
use calbook_db::models::{DbSlotWithBooking, DbUser};
use calbook_db::repositories::{
    self,
    time_slot::{SlotAvailability, SlotFilter},
};

use crate::{
    middleware::{auth::AuthUser, error_handling::AppError},
    ApiState,
};

/// Query parameters for the time slot listing.
///
/// Dates are `YYYY-MM-DD`; `categories` is a comma-separated list of
/// category names; `available_only=true` drops booked slots.
#[derive(Debug, Deserialize)]
pub struct TimeSlotsQuery {
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub categories: Option<String>,
    pub available_only: Option<bool>,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError(CalendarError::Validation(
            "Invalid date format. Use YYYY-MM-DD".to_string(),
        ))
    })
}

/// Per-caller slot projection: `is_booked`/`booked_by` come from the booking
/// join, `can_book` is the conflict engine's advisory answer for this user.
pub(crate) fn slot_response(
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

#[axum::debug_handler]
pub async fn list_time_slots(
    State(state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<TimeSlotsQuery>,
) -> Result<Json<Vec<TimeSlotResponse>>, AppError> {
    let mut filter = SlotFilter::default();

    if let Some(date) = &query.date {
        filter.date = Some(parse_date(date)?);
    }
    if let Some(start_date) = &query.start_date {
        filter.start_date = Some(parse_date(start_date)?);
    }
    if let Some(end_date) = &query.end_date {
        filter.end_date = Some(parse_date(end_date)?);
    }
    if let Some(categories) = &query.categories {
        filter.category_names = categories
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
    }
    if query.available_only.unwrap_or(false) {
        filter.availability = Some(SlotAvailability::Available);
    }

    let slots = repositories::time_slot::list_slots(&state.db_pool, &filter)
        .await
        .map_err(CalendarError::Database)?;

    let held = repositories::time_slot::user_booked_windows(&state.db_pool, user.id)
        .await
        .map_err(CalendarError::Database)?;

    let now = Utc::now();
    let response = slots
        .into_iter()
        .map(|slot| slot_response(slot, &user, &held, now))
        .collect();

    Ok(Json(response))
}
