use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRef;

/// Lifecycle event broadcast to every connected calendar subscriber.
///
/// Serialized as `{"type": "<discriminant>", "data": {...}}`; the four
/// discriminants are the complete wire vocabulary of the fan-out channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CalendarEvent {
    SlotCreated(SlotEventPayload),
    SlotDeleted(SlotEventPayload),
    BookingCreated(BookingEventPayload),
    BookingCancelled(BookingEventPayload),
}

/// Snapshot of a slot's externally visible fields at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEventPayload {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Snapshot of a booking and its slot. Captured before deletion for
/// cancellation events, since the row is gone by publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingEventPayload {
    pub id: Uuid,
    pub user: UserRef,
    pub time_slot: SlotEventPayload,
}
