use crate::models::{DbBooking, DbBookingDetail, DbTimeSlot};
use crate::repositories::{db_error, is_unique_violation};
use calbook_core::conflict::{self, ConflictReason};
use calbook_core::errors::{CalendarError, CalendarResult};
use calbook_core::models::booking::BookingStatusFilter;
use calbook_core::models::time_slot::SlotWindow;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

const BOOKING_DETAIL_SELECT: &str = r#"
SELECT b.id, b.user_id, u.username, u.email, u.is_staff AS user_is_staff,
       b.time_slot_id, ts.category_id, c.name AS category_name,
       ts.start_time, ts.end_time, b.booked_at
FROM bookings b
JOIN users u ON u.id = b.user_id
JOIN time_slots ts ON ts.id = b.time_slot_id
JOIN categories c ON c.id = ts.category_id
"#;

/// Admin booking listing filters.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub username_contains: Option<String>,
    pub category_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Book a slot for a user inside one transaction.
///
/// The slot row is locked with `FOR UPDATE` and the full conflict check is
/// re-run against in-transaction state, so a competing request observes the
/// winner's booking after the lock is released. The unique constraint on
/// `bookings.time_slot_id` remains the final arbiter: a violation racing
/// past the re-check is translated into the same domain conflict the
/// pre-check would have produced.
pub async fn create_booking(
    pool: &Pool<Postgres>,
    time_slot_id: Uuid,
    user_id: Uuid,
) -> CalendarResult<DbBooking> {
    let now = Utc::now();
    let mut tx = pool.begin().await.map_err(db_error)?;

    let slot = sqlx::query_as::<_, DbTimeSlot>(
        r#"
        SELECT id, category_id, start_time, end_time, created_by, created_at
        FROM time_slots
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(time_slot_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_error)?
    .ok_or_else(|| CalendarError::NotFound(format!("Time slot {time_slot_id} not found")))?;

    let booked_by: Option<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM bookings WHERE time_slot_id = $1")
            .bind(time_slot_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;

    let held: Vec<(Uuid, Uuid, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT ts.id, ts.category_id, ts.start_time, ts.end_time
        FROM bookings b
        JOIN time_slots ts ON ts.id = b.time_slot_id
        WHERE b.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await
    .map_err(db_error)?;
    let held: Vec<SlotWindow> = held
        .into_iter()
        .map(|(id, category_id, start_time, end_time)| SlotWindow {
            id,
            category_id,
            start_time,
            end_time,
        })
        .collect();

    let window = SlotWindow {
        id: slot.id,
        category_id: slot.category_id,
        start_time: slot.start_time,
        end_time: slot.end_time,
    };
    conflict::can_book_slot(now, user_id, &window, booked_by, &held)?;

    let booking = sqlx::query_as::<_, DbBooking>(
        r#"
        INSERT INTO bookings (time_slot_id, user_id)
        VALUES ($1, $2)
        RETURNING id, time_slot_id, user_id, booked_at
        "#,
    )
    .bind(time_slot_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            tracing::warn!(
                "Booking insert for slot {} lost a concurrent race",
                time_slot_id
            );
            CalendarError::Conflict(ConflictReason::AlreadyBooked.to_string())
        } else {
            db_error(err)
        }
    })?;

    tx.commit().await.map_err(db_error)?;

    tracing::info!("User {} booked slot {}", user_id, time_slot_id);
    Ok(booking)
}

pub async fn get_booking_detail(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbBookingDetail>> {
    let booking = sqlx::query_as::<_, DbBookingDetail>(
        &format!("{BOOKING_DETAIL_SELECT} WHERE b.id = $1"),
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(booking)
}

pub async fn delete_booking(pool: &Pool<Postgres>, id: Uuid) -> CalendarResult<()> {
    let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error)?;

    if result.rows_affected() == 0 {
        return Err(CalendarError::NotFound(format!("Booking {id} not found")));
    }

    tracing::info!("Deleted booking {}", id);
    Ok(())
}

pub async fn list_user_bookings(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    status: Option<BookingStatusFilter>,
    now: DateTime<Utc>,
) -> Result<Vec<DbBookingDetail>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(BOOKING_DETAIL_SELECT);
    query.push(" WHERE b.user_id = ").push_bind(user_id);

    match status {
        Some(BookingStatusFilter::Upcoming) => {
            query.push(" AND ts.start_time >= ").push_bind(now);
        }
        Some(BookingStatusFilter::Past) => {
            query.push(" AND ts.start_time < ").push_bind(now);
        }
        None => {}
    }
    query.push(" ORDER BY b.booked_at DESC");

    let bookings = query
        .build_query_as::<DbBookingDetail>()
        .fetch_all(pool)
        .await?;

    Ok(bookings)
}

pub async fn list_bookings(
    pool: &Pool<Postgres>,
    filter: &BookingFilter,
) -> Result<Vec<DbBookingDetail>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(BOOKING_DETAIL_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(date) = filter.date {
        query.push(" AND ts.start_time::date = ").push_bind(date);
    }
    if let Some(username) = &filter.username_contains {
        query
            .push(" AND u.username ILIKE ")
            .push_bind(format!("%{username}%"));
    }
    if let Some(category_id) = filter.category_id {
        query.push(" AND ts.category_id = ").push_bind(category_id);
    }
    query.push(" ORDER BY b.booked_at DESC");
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ").push_bind(limit);
    }

    let bookings = query
        .build_query_as::<DbBookingDetail>()
        .fetch_all(pool)
        .await?;

    Ok(bookings)
}
