use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub time_slot_id: Uuid,
    pub user_id: Uuid,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub time_slot_id: Uuid,
}

/// Slot detail embedded in booking responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlotInfo {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBookingResponse {
    pub id: Uuid,
    pub time_slot: BookedSlotInfo,
    pub booked_at: DateTime<Utc>,
    pub can_cancel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBookingUserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBookingResponse {
    pub id: Uuid,
    pub user_info: AdminBookingUserInfo,
    pub time_slot_info: BookedSlotInfo,
    pub booked_at: DateTime<Utc>,
    pub can_cancel: bool,
}

/// `status` filter accepted by the own-bookings listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatusFilter {
    Upcoming,
    Past,
}
