use chrono::NaiveTime;

use crate::models::{BookedInterval, Slot};

/// Half-open overlap: `[start1, end1)` and `[start2, end2)` intersect.
pub fn intervals_overlap(start1: NaiveTime, end1: NaiveTime, start2: NaiveTime, end2: NaiveTime) -> bool {
    start1 < end2 && start2 < end1
}

/// Active bookings on the proposed date that overlap the proposed interval.
pub fn conflicting_bookings<'a>(
    existing: &'a [BookedInterval],
    proposed: &'a Slot,
) -> impl Iterator<Item = &'a BookedInterval> + 'a {
    existing.iter().filter(move |booking| {
        booking.is_active()
            && booking.date == proposed.date
            && intervals_overlap(proposed.start_time, proposed.end_time, booking.start_time, booking.end_time)
    })
}

/// True when the proposed interval overlaps any non-cancelled booking.
pub fn has_conflict(existing: &[BookedInterval], proposed: &Slot) -> bool {
    conflicting_bookings(existing, proposed).next().is_some()
}
