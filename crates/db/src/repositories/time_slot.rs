use crate::models::{DbCategory, DbSlotWithBooking, DbTimeSlot};
use crate::repositories::db_error;
use calbook_core::conflict;
use calbook_core::errors::{CalendarError, CalendarResult};
use calbook_core::models::time_slot::{SlotWindow, UpdateTimeSlotRequest};
use chrono::{DateTime, NaiveDate, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

const SLOT_WITH_BOOKING_SELECT: &str = r#"
SELECT ts.id, ts.category_id, c.name AS category_name,
       ts.start_time, ts.end_time,
       ts.created_by, u.username AS created_by_username, ts.created_at,
       b.id AS booking_id, b.user_id AS booked_by_id,
       bu.username AS booked_by_username, bu.email AS booked_by_email,
       b.booked_at
FROM time_slots ts
JOIN categories c ON c.id = ts.category_id
JOIN users u ON u.id = ts.created_by
LEFT JOIN bookings b ON b.time_slot_id = ts.id
LEFT JOIN users bu ON bu.id = b.user_id
"#;

/// `status=booked|available` filter on slot listings. Availability is the
/// presence of a booking row, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAvailability {
    Booked,
    Available,
}

#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_names: Vec<String>,
    pub category_id: Option<Uuid>,
    pub availability: Option<SlotAvailability>,
}

pub async fn list_slots(
    pool: &Pool<Postgres>,
    filter: &SlotFilter,
) -> Result<Vec<DbSlotWithBooking>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SLOT_WITH_BOOKING_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(date) = filter.date {
        query.push(" AND ts.start_time::date = ").push_bind(date);
    }
    if let Some(start_date) = filter.start_date {
        query
            .push(" AND ts.start_time::date >= ")
            .push_bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        query
            .push(" AND ts.start_time::date <= ")
            .push_bind(end_date);
    }
    if !filter.category_names.is_empty() {
        query
            .push(" AND c.name = ANY(")
            .push_bind(filter.category_names.clone())
            .push(")");
    }
    if let Some(category_id) = filter.category_id {
        query.push(" AND ts.category_id = ").push_bind(category_id);
    }
    match filter.availability {
        Some(SlotAvailability::Booked) => {
            query.push(" AND b.id IS NOT NULL");
        }
        Some(SlotAvailability::Available) => {
            query.push(" AND b.id IS NULL");
        }
        None => {}
    }
    query.push(" ORDER BY ts.start_time ASC");

    let slots = query
        .build_query_as::<DbSlotWithBooking>()
        .fetch_all(pool)
        .await?;

    Ok(slots)
}

pub async fn get_slot_with_booking(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbSlotWithBooking>> {
    let slot = sqlx::query_as::<_, DbSlotWithBooking>(
        &format!("{SLOT_WITH_BOOKING_SELECT} WHERE ts.id = $1"),
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(slot)
}

/// Slot windows the booking pre-check runs against for one user: the
/// intervals of every slot the user currently holds a booking on.
pub async fn user_booked_windows(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Vec<SlotWindow>> {
    let rows: Vec<(Uuid, Uuid, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT ts.id, ts.category_id, ts.start_time, ts.end_time
        FROM bookings b
        JOIN time_slots ts ON ts.id = b.time_slot_id
        WHERE b.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(window_from_row).collect())
}

pub async fn create_time_slot(
    pool: &Pool<Postgres>,
    category_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_by: Uuid,
) -> CalendarResult<DbTimeSlot> {
    let mut tx = pool.begin().await.map_err(db_error)?;

    // Serializes slot writes within the category so the overlap re-check
    // cannot race a concurrent insert.
    lock_category(&mut tx, category_id).await?;

    let existing = category_windows(&mut tx, category_id).await?;
    conflict::can_create_slot(category_id, start_time, end_time, None, &existing, Utc::now())?;

    let slot = sqlx::query_as::<_, DbTimeSlot>(
        r#"
        INSERT INTO time_slots (category_id, start_time, end_time, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING id, category_id, start_time, end_time, created_by, created_at
        "#,
    )
    .bind(category_id)
    .bind(start_time)
    .bind(end_time)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    tracing::info!("Created time slot {} in category {}", slot.id, category_id);
    Ok(slot)
}

pub async fn update_time_slot(
    pool: &Pool<Postgres>,
    id: Uuid,
    changes: &UpdateTimeSlotRequest,
) -> CalendarResult<DbTimeSlot> {
    let mut tx = pool.begin().await.map_err(db_error)?;

    let slot = sqlx::query_as::<_, DbTimeSlot>(
        r#"
        SELECT id, category_id, start_time, end_time, created_by, created_at
        FROM time_slots
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_error)?
    .ok_or_else(|| CalendarError::NotFound(format!("Time slot {id} not found")))?;

    let is_booked = slot_is_booked(&mut tx, id).await?;
    conflict::can_modify_slot(is_booked, changes.touches_scheduling())?;

    let category_id = changes.category_id.unwrap_or(slot.category_id);
    let start_time = changes.start_time.unwrap_or(slot.start_time);
    let end_time = changes.end_time.unwrap_or(slot.end_time);

    lock_category(&mut tx, category_id).await?;
    let existing = category_windows(&mut tx, category_id).await?;
    conflict::can_create_slot(category_id, start_time, end_time, Some(id), &existing, Utc::now())?;

    let updated = sqlx::query_as::<_, DbTimeSlot>(
        r#"
        UPDATE time_slots
        SET category_id = $2, start_time = $3, end_time = $4
        WHERE id = $1
        RETURNING id, category_id, start_time, end_time, created_by, created_at
        "#,
    )
    .bind(id)
    .bind(category_id)
    .bind(start_time)
    .bind(end_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    Ok(updated)
}

/// Delete an unbooked slot. Returns the deleted row so the caller can build
/// the `slot_deleted` event payload.
pub async fn delete_time_slot(pool: &Pool<Postgres>, id: Uuid) -> CalendarResult<DbTimeSlot> {
    let mut tx = pool.begin().await.map_err(db_error)?;

    let slot = sqlx::query_as::<_, DbTimeSlot>(
        r#"
        SELECT id, category_id, start_time, end_time, created_by, created_at
        FROM time_slots
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_error)?
    .ok_or_else(|| CalendarError::NotFound(format!("Time slot {id} not found")))?;

    let is_booked = slot_is_booked(&mut tx, id).await?;
    conflict::can_delete_slot(is_booked)?;

    sqlx::query("DELETE FROM time_slots WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

    tx.commit().await.map_err(db_error)?;

    tracing::info!("Deleted time slot {}", id);
    Ok(slot)
}

async fn lock_category(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Uuid,
) -> CalendarResult<DbCategory> {
    sqlx::query_as::<_, DbCategory>(
        r#"
        SELECT id, name, created_at
        FROM categories
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(category_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error)?
    .ok_or_else(|| CalendarError::NotFound(format!("Category {category_id} not found")))
}

async fn category_windows(
    tx: &mut Transaction<'_, Postgres>,
    category_id: Uuid,
) -> CalendarResult<Vec<SlotWindow>> {
    let rows: Vec<(Uuid, Uuid, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT id, category_id, start_time, end_time
        FROM time_slots
        WHERE category_id = $1
        "#,
    )
    .bind(category_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(db_error)?;

    Ok(rows.into_iter().map(window_from_row).collect())
}

async fn slot_is_booked(
    tx: &mut Transaction<'_, Postgres>,
    slot_id: Uuid,
) -> CalendarResult<bool> {
    let booking: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM bookings WHERE time_slot_id = $1")
            .bind(slot_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_error)?;

    Ok(booking.is_some())
}

fn window_from_row(
    (id, category_id, start_time, end_time): (Uuid, Uuid, DateTime<Utc>, DateTime<Utc>),
) -> SlotWindow {
    SlotWindow {
        id,
        category_id,
        start_time,
        end_time,
    }
}
