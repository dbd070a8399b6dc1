use calbook_core::conflict::{
    can_book_slot, can_cancel_booking, can_create_slot, can_delete_slot, can_modify_slot,
    check_slot_window, overlaps, Actor, ConflictReason,
};
use calbook_core::models::time_slot::SlotWindow;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, hour, minute, 0).unwrap()
}

fn slot(category_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> SlotWindow {
    SlotWindow {
        id: Uuid::new_v4(),
        category_id,
        start_time: start,
        end_time: end,
    }
}

#[rstest]
// True intersections
#[case(10, 0, 11, 0, 10, 30, 11, 30, true)]
#[case(10, 30, 11, 30, 10, 0, 11, 0, true)]
#[case(10, 0, 12, 0, 10, 30, 11, 0, true)]
#[case(10, 30, 11, 0, 10, 0, 12, 0, true)]
// Touching endpoints do not count under half-open semantics
#[case(10, 0, 11, 0, 11, 0, 12, 0, false)]
#[case(11, 0, 12, 0, 10, 0, 11, 0, false)]
// Fully disjoint
#[case(10, 0, 11, 0, 13, 0, 14, 0, false)]
fn overlap_uses_half_open_intervals(
    #[case] a_sh: u32,
    #[case] a_sm: u32,
    #[case] a_eh: u32,
    #[case] a_em: u32,
    #[case] b_sh: u32,
    #[case] b_sm: u32,
    #[case] b_eh: u32,
    #[case] b_em: u32,
    #[case] expected: bool,
) {
    let result = overlaps(at(a_sh, a_sm), at(a_eh, a_em), at(b_sh, b_sm), at(b_eh, b_em));
    assert_eq!(result, expected);
}

#[test]
fn slot_window_rejects_inverted_and_short_windows() {
    let now = at(8, 0);

    assert_eq!(
        check_slot_window(at(11, 0), at(10, 0), now, true),
        Err(ConflictReason::InvertedWindow)
    );
    assert_eq!(
        check_slot_window(at(10, 0), at(10, 0), now, true),
        Err(ConflictReason::InvertedWindow)
    );
    assert_eq!(
        check_slot_window(at(10, 0), at(10, 10), now, true),
        Err(ConflictReason::BelowMinimumDuration)
    );
    // Exactly the minimum is allowed
    assert_eq!(check_slot_window(at(10, 0), at(10, 15), now, true), Ok(()));
}

#[test]
fn new_slots_may_not_start_in_the_past() {
    let now = at(12, 0);
    assert_eq!(
        check_slot_window(at(10, 0), at(11, 0), now, true),
        Err(ConflictReason::StartsInPast)
    );
    // Updates may keep an already-elapsed window
    assert_eq!(check_slot_window(at(10, 0), at(11, 0), now, false), Ok(()));
}

#[test]
fn slot_creation_rejects_same_category_overlap_only() {
    let cat_1 = Uuid::new_v4();
    let cat_2 = Uuid::new_v4();
    let now = at(8, 0);
    let existing = vec![slot(cat_1, at(10, 0), at(11, 0))];

    // 10:30-11:30 collides with the 10:00-11:00 slot in Cat 1...
    assert_eq!(
        can_create_slot(cat_1, at(10, 30), at(11, 30), None, &existing, now),
        Err(ConflictReason::CategoryOverlap)
    );
    // ...but the same window in Cat 2 is fine
    assert_eq!(
        can_create_slot(cat_2, at(10, 30), at(11, 30), None, &existing, now),
        Ok(())
    );
    // Back-to-back in the same category is fine
    assert_eq!(
        can_create_slot(cat_1, at(11, 0), at(12, 0), None, &existing, now),
        Ok(())
    );
}

#[test]
fn slot_update_excludes_itself_from_the_overlap_scan() {
    let cat = Uuid::new_v4();
    let now = at(8, 0);
    let existing = vec![slot(cat, at(10, 0), at(11, 0))];
    let own_id = existing[0].id;

    // Widening the slot over its own current window is not a self-conflict
    assert_eq!(
        can_create_slot(cat, at(10, 0), at(11, 30), Some(own_id), &existing, now),
        Ok(())
    );
    // But it still collides with everyone else
    let other = vec![
        existing[0],
        slot(cat, at(11, 30), at(12, 30)),
    ];
    assert_eq!(
        can_create_slot(cat, at(10, 0), at(12, 0), Some(own_id), &other, now),
        Err(ConflictReason::CategoryOverlap)
    );
}

#[test]
fn booking_denied_for_past_slots() {
    let now = at(12, 0);
    let user = Uuid::new_v4();
    let past = slot(Uuid::new_v4(), at(10, 0), at(11, 0));

    assert_eq!(
        can_book_slot(now, user, &past, None, &[]),
        Err(ConflictReason::SlotInPast)
    );
}

#[test]
fn booking_denied_when_slot_already_booked() {
    let now = at(8, 0);
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();
    let target = slot(Uuid::new_v4(), at(10, 0), at(11, 0));

    assert_eq!(
        can_book_slot(now, user, &target, Some(other), &[]),
        Err(ConflictReason::AlreadyBooked)
    );
    assert_eq!(
        can_book_slot(now, user, &target, Some(user), &[]),
        Err(ConflictReason::AlreadyBookedByYou)
    );
    assert_eq!(can_book_slot(now, user, &target, None, &[]), Ok(()));
}

#[test]
fn booking_denied_on_cross_category_self_overlap() {
    let now = at(8, 0);
    let user = Uuid::new_v4();
    let cat_1 = Uuid::new_v4();
    let cat_2 = Uuid::new_v4();

    // User already holds 10:00-11:00 in Cat 1; 10:30-11:30 in Cat 2 is denied
    let held = vec![slot(cat_1, at(10, 0), at(11, 0))];
    let target = slot(cat_2, at(10, 30), at(11, 30));
    assert_eq!(
        can_book_slot(now, user, &target, None, &held),
        Err(ConflictReason::OverlapsOwnBooking)
    );

    // A back-to-back slot is allowed
    let adjacent = slot(cat_2, at(11, 0), at(12, 0));
    assert_eq!(can_book_slot(now, user, &adjacent, None, &held), Ok(()));
}

#[test]
fn cancelling_frees_the_window_for_rebooking() {
    let now = at(8, 0);
    let user = Uuid::new_v4();
    let target = slot(Uuid::new_v4(), at(10, 0), at(11, 0));

    // Booked: denied. After cancellation the booking list is empty and the
    // slot owner is gone, so the same request is granted.
    assert_eq!(
        can_book_slot(now, user, &target, Some(Uuid::new_v4()), &[]),
        Err(ConflictReason::AlreadyBooked)
    );
    assert_eq!(can_book_slot(now, user, &target, None, &[]), Ok(()));
}

#[test]
fn owner_cancellation_respects_the_start_cutoff() {
    let user = Actor {
        id: Uuid::new_v4(),
        is_staff: false,
    };

    // Before the slot starts: allowed
    assert_eq!(
        can_cancel_booking(at(9, 0), &user, user.id, at(10, 0)),
        Ok(())
    );
    // At or after the start: denied
    assert_eq!(
        can_cancel_booking(at(10, 0), &user, user.id, at(10, 0)),
        Err(ConflictReason::CancellationCutoffPassed)
    );
    assert_eq!(
        can_cancel_booking(at(11, 0), &user, user.id, at(10, 0)),
        Err(ConflictReason::CancellationCutoffPassed)
    );
}

#[test]
fn only_the_owner_may_self_cancel() {
    let user = Actor {
        id: Uuid::new_v4(),
        is_staff: false,
    };
    let someone_else = Uuid::new_v4();

    assert_eq!(
        can_cancel_booking(at(9, 0), &user, someone_else, at(10, 0)),
        Err(ConflictReason::NotBookingOwner)
    );
}

#[test]
fn admin_cancels_anything_including_past_bookings() {
    let admin = Actor {
        id: Uuid::new_v4(),
        is_staff: true,
    };
    let owner = Uuid::new_v4();

    // Slot started an hour ago and belongs to someone else; still fine
    assert_eq!(
        can_cancel_booking(at(11, 0), &admin, owner, at(10, 0)),
        Ok(())
    );
}

#[test]
fn booked_slots_are_frozen_and_undeletable() {
    assert_eq!(
        can_modify_slot(true, true),
        Err(ConflictReason::BookedSlotFrozen)
    );
    // Non-scheduling updates stay allowed even when booked
    assert_eq!(can_modify_slot(true, false), Ok(()));
    assert_eq!(can_modify_slot(false, true), Ok(()));

    assert_eq!(
        can_delete_slot(true),
        Err(ConflictReason::BookedSlotNotDeletable)
    );
    assert_eq!(can_delete_slot(false), Ok(()));
}

#[test]
fn minimum_duration_boundary_is_inclusive() {
    let now = at(8, 0);
    let start = at(10, 0);
    assert_eq!(
        check_slot_window(start, start + Duration::minutes(15), now, true),
        Ok(())
    );
    assert_eq!(
        check_slot_window(start, start + Duration::minutes(14), now, true),
        Err(ConflictReason::BelowMinimumDuration)
    );
}
