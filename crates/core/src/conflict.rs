//! Conflict engine for slot and booking lifecycle decisions.
//!
//! Every check here is an advisory pure function over a snapshot of current
//! state. Callers must re-apply the decision inside a single transactional
//! write (row locks plus the uniqueness constraint on bookings) so that a
//! concurrent mutation cannot race the check-then-act sequence.
//!
//! All interval comparisons use half-open `[start, end)` semantics: a slot
//! ending at T and a slot starting at T do not conflict. The same rule is
//! applied to slot-vs-slot and booking-vs-booking checks.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::CalendarError;
use crate::models::time_slot::SlotWindow;

/// Minimum bookable slot length.
pub const MIN_SLOT_DURATION_MINUTES: i64 = 15;

/// Denial reason returned by every conflict check. The display string is
/// surfaced verbatim to the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictReason {
    #[error("Start time must be before end time")]
    InvertedWindow,

    #[error("Time slot must be at least 15 minutes long")]
    BelowMinimumDuration,

    #[error("Cannot create time slots in the past")]
    StartsInPast,

    #[error("Time slot overlaps with existing slot in the same category")]
    CategoryOverlap,

    #[error("Time slot is in the past")]
    SlotInPast,

    #[error("You have already booked this slot")]
    AlreadyBookedByYou,

    #[error("This slot is already booked by another user")]
    AlreadyBooked,

    #[error("You have a conflicting booking at this time")]
    OverlapsOwnBooking,

    #[error("You can only cancel your own bookings")]
    NotBookingOwner,

    #[error("Cannot cancel a booking after the time slot has started")]
    CancellationCutoffPassed,

    #[error("Cannot modify time or category of booked slot")]
    BookedSlotFrozen,

    #[error("Cannot delete booked time slot")]
    BookedSlotNotDeletable,
}

impl From<ConflictReason> for CalendarError {
    fn from(reason: ConflictReason) -> Self {
        CalendarError::Conflict(reason.to_string())
    }
}

/// The authenticated principal a decision is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub is_staff: bool,
}

/// Half-open interval intersection: `[a_start, a_end)` and
/// `[b_start, b_end)` share at least one instant.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Validates a slot window in isolation: ordering, minimum duration, and
/// (for new slots only) that the window has not already started.
pub fn check_slot_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    is_new: bool,
) -> Result<(), ConflictReason> {
    if start >= end {
        return Err(ConflictReason::InvertedWindow);
    }
    if end - start < Duration::minutes(MIN_SLOT_DURATION_MINUTES) {
        return Err(ConflictReason::BelowMinimumDuration);
    }
    if is_new && start < now {
        return Err(ConflictReason::StartsInPast);
    }
    Ok(())
}

/// Decides whether a slot with the given window may exist in `category_id`
/// alongside `existing` slots. `exclude` names the slot being updated so it
/// does not collide with itself. Slots in other categories never conflict.
pub fn can_create_slot(
    category_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
    existing: &[SlotWindow],
    now: DateTime<Utc>,
) -> Result<(), ConflictReason> {
    check_slot_window(start, end, now, exclude.is_none())?;

    let collision = existing.iter().any(|slot| {
        slot.category_id == category_id
            && Some(slot.id) != exclude
            && overlaps(start, end, slot.start_time, slot.end_time)
    });
    if collision {
        return Err(ConflictReason::CategoryOverlap);
    }
    Ok(())
}

/// Decides whether `user_id` may book `slot`.
///
/// `booked_by` is the owner of the slot's existing booking, if any.
/// `user_bookings` holds the slot windows of the user's current bookings;
/// the overlap scan runs across all categories, so two bookings by the same
/// user may never intersect in time even in unrelated categories.
pub fn can_book_slot(
    now: DateTime<Utc>,
    user_id: Uuid,
    slot: &SlotWindow,
    booked_by: Option<Uuid>,
    user_bookings: &[SlotWindow],
) -> Result<(), ConflictReason> {
    if slot.start_time < now {
        return Err(ConflictReason::SlotInPast);
    }
    match booked_by {
        Some(owner) if owner == user_id => return Err(ConflictReason::AlreadyBookedByYou),
        Some(_) => return Err(ConflictReason::AlreadyBooked),
        None => {}
    }
    let conflicting = user_bookings.iter().any(|booked| {
        booked.id != slot.id
            && overlaps(slot.start_time, slot.end_time, booked.start_time, booked.end_time)
    });
    if conflicting {
        return Err(ConflictReason::OverlapsOwnBooking);
    }
    Ok(())
}

/// Decides whether `actor` may cancel a booking owned by `booking_user_id`
/// on a slot starting at `slot_start`.
///
/// Staff cancel unconditionally. Owners cancel only while the slot has not
/// started; the start time is the sole cutoff, with no grace window.
pub fn can_cancel_booking(
    now: DateTime<Utc>,
    actor: &Actor,
    booking_user_id: Uuid,
    slot_start: DateTime<Utc>,
) -> Result<(), ConflictReason> {
    if actor.is_staff {
        return Ok(());
    }
    if actor.id != booking_user_id {
        return Err(ConflictReason::NotBookingOwner);
    }
    if slot_start <= now {
        return Err(ConflictReason::CancellationCutoffPassed);
    }
    Ok(())
}

/// A booked slot is frozen on its scheduling fields; anything else on it
/// stays mutable.
pub fn can_modify_slot(is_booked: bool, touches_scheduling: bool) -> Result<(), ConflictReason> {
    if is_booked && touches_scheduling {
        return Err(ConflictReason::BookedSlotFrozen);
    }
    Ok(())
}

pub fn can_delete_slot(is_booked: bool) -> Result<(), ConflictReason> {
    if is_booked {
        return Err(ConflictReason::BookedSlotNotDeletable);
    }
    Ok(())
}
