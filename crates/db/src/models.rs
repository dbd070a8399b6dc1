use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAuthToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCategory {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbTimeSlot {
    pub id: Uuid,
    pub category_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBooking {
    pub id: Uuid,
    pub time_slot_id: Uuid,
    pub user_id: Uuid,
    pub booked_at: DateTime<Utc>,
}

/// Slot row joined with its category and (optional) booking. Availability
/// is derived from the presence of the booking columns, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSlotWithBooking {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
    pub booking_id: Option<Uuid>,
    pub booked_by_id: Option<Uuid>,
    pub booked_by_username: Option<String>,
    pub booked_by_email: Option<String>,
    pub booked_at: Option<DateTime<Utc>>,
}

impl DbSlotWithBooking {
    pub fn is_booked(&self) -> bool {
        self.booking_id.is_some()
    }
}

/// Booking row joined with its user, slot and category.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBookingDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub user_is_staff: bool,
    pub time_slot_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub booked_at: DateTime<Utc>,
}
