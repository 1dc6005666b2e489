use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{BookedInterval, SchedulingError, Slot, WorkingWindow};
use crate::services::conflict::has_conflict;
use crate::services::store::{ScheduleStore, SupabaseScheduleStore};

/// Free slots for `date`, earliest first.
///
/// Candidates are cut from every working window whose weekday matches `date`
/// at `slot_duration` steps (falling back to each window's own duration); a
/// trailing partial slot is dropped. Candidates overlapping an active booking
/// or an already accepted slot are skipped. Scanning stops at the daily cap:
/// the smallest `max_slots_per_day` among the matching windows, lowered
/// further by `max_daily` when given. A requested cap never raises it.
pub fn compute_available_slots(
    windows: &[WorkingWindow],
    booked: &[BookedInterval],
    date: NaiveDate,
    slot_duration: Option<Duration>,
    max_daily: Option<usize>,
) -> Result<Vec<Slot>, SchedulingError> {
    if let Some(duration) = slot_duration {
        if duration <= Duration::zero() {
            return Err(SchedulingError::Validation("Slot duration must be positive".to_string()));
        }
    }

    let mut matching: Vec<&WorkingWindow> = windows
        .iter()
        .filter(|window| window.day_of_week == date.weekday())
        .collect();
    matching.sort_by_key(|window| (window.start_time, window.end_time));

    let mut candidates = Vec::new();
    for window in &matching {
        window.validate()?;
        let duration = slot_duration.unwrap_or_else(|| window.slot_duration());
        if duration <= Duration::zero() {
            return Err(SchedulingError::Validation(format!(
                "Working window on {} has no slot duration",
                window.day_of_week
            )));
        }

        let mut start = window.start_time;
        loop {
            let (end, wrapped) = start.overflowing_add_signed(duration);
            if wrapped != 0 || end > window.end_time {
                break;
            }
            candidates.push(Slot { date, start_time: start, end_time: end });
            start = end;
        }
    }
    candidates.sort_by_key(|slot| (slot.start_time, slot.end_time));

    let cap = effective_cap(max_daily, window_cap(&matching));
    let mut slots: Vec<Slot> = Vec::new();

    for candidate in candidates {
        if cap.is_some_and(|cap| slots.len() >= cap) {
            break;
        }
        if has_conflict(booked, &candidate) {
            continue;
        }
        // Overlapping windows can yield overlapping candidates; keep the earliest.
        if slots.last().is_some_and(|last| candidate.start_time < last.end_time) {
            continue;
        }
        slots.push(candidate);
    }

    Ok(slots)
}

fn window_cap(windows: &[&WorkingWindow]) -> Option<usize> {
    windows.iter().filter_map(|window| window.max_slots_per_day).min()
}

fn effective_cap(requested: Option<usize>, configured: Option<usize>) -> Option<usize> {
    match (requested, configured) {
        (Some(requested), Some(configured)) => Some(requested.min(configured)),
        (requested, configured) => requested.or(configured),
    }
}

/// True when `slot` lies entirely inside a working window for its weekday.
pub fn within_working_hours(windows: &[WorkingWindow], slot: &Slot) -> bool {
    windows
        .iter()
        .any(|window| window.day_of_week == slot.date.weekday() && window.contains(slot))
}

pub struct AvailabilityService {
    store: Arc<dyn ScheduleStore>,
    default_max_daily: usize,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(SupabaseScheduleStore::new(config)), config.default_max_daily_slots)
    }

    pub fn with_store(store: Arc<dyn ScheduleStore>, default_max_daily: usize) -> Self {
        Self { store, default_max_daily }
    }

    /// Calculate available slots for a practitioner on a specific date
    pub async fn get_available_slots(
        &self,
        practitioner_id: &str,
        date: NaiveDate,
        duration_minutes: Option<u32>,
        max_daily: Option<usize>,
    ) -> Result<Vec<Slot>, SchedulingError> {
        debug!("Calculating available slots for practitioner {} on {}", practitioner_id, date);

        let practitioner = self.store.find_practitioner(practitioner_id).await.map_err(|err| {
            SchedulingError::from_lookup(err, SchedulingError::PractitionerNotFound(practitioner_id.to_string()))
        })?;
        match practitioner {
            Some(practitioner) if practitioner.is_accepting_bookings => {}
            _ => return Err(SchedulingError::PractitionerNotFound(practitioner_id.to_string())),
        }

        let windows = self.store.working_windows(practitioner_id).await?;
        let booked = self.store.bookings_for_date(practitioner_id, date).await?;

        let windows_for_day: Vec<&WorkingWindow> =
            windows.iter().filter(|window| window.day_of_week == date.weekday()).collect();
        let configured = window_cap(&windows_for_day).unwrap_or(self.default_max_daily);
        let cap = max_daily.map_or(configured, |requested| requested.min(configured));

        let slots = compute_available_slots(
            &windows,
            &booked,
            date,
            duration_minutes.map(|minutes| Duration::minutes(i64::from(minutes))),
            Some(cap),
        )?;

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::{NaiveTime, Weekday};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2024-03-04 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn booking(start: NaiveTime, end: NaiveTime) -> BookedInterval {
        BookedInterval::new("p-1", None, &Slot::new(monday(), start, end).unwrap())
    }

    fn starts(slots: &[Slot]) -> Vec<NaiveTime> {
        slots.iter().map(|slot| slot.start_time).collect()
    }

    #[test]
    fn morning_window_yields_six_half_hour_slots() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30)];
        let slots = compute_available_slots(&windows, &[], monday(), None, None).unwrap();
        assert_eq!(
            starts(&slots),
            vec![t(9, 0), t(9, 30), t(10, 0), t(10, 30), t(11, 0), t(11, 30)]
        );
        assert!(slots.iter().all(|slot| slot.duration_minutes() == 30));
    }

    #[test]
    fn booked_slot_is_excluded() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30)];
        let booked = vec![booking(t(10, 0), t(10, 30))];
        let slots = compute_available_slots(&windows, &booked, monday(), None, None).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30), t(10, 30), t(11, 0), t(11, 30)]);
    }

    #[test]
    fn long_booking_blocks_every_slot_it_spans() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30)];
        let booked = vec![booking(t(9, 45), t(11, 5))];
        let slots = compute_available_slots(&windows, &booked, monday(), None, None).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0), t(11, 30)]);
    }

    #[test]
    fn cancelled_booking_does_not_block() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(10, 0), 30)];
        let mut cancelled = booking(t(9, 0), t(9, 30));
        cancelled.status = BookingStatus::Cancelled;
        let slots = compute_available_slots(&windows, &[cancelled], monday(), None, None).unwrap();
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn other_weekday_yields_nothing() {
        let windows = vec![WorkingWindow::new(Weekday::Tue, t(9, 0), t(12, 0), 30)];
        let slots = compute_available_slots(&windows, &[], monday(), None, None).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn trailing_partial_slot_is_dropped() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(10, 10), 20)];
        let slots = compute_available_slots(&windows, &[], monday(), None, None).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 20), t(9, 40)]);
        assert!(slots.iter().all(|slot| slot.end_time <= t(10, 10)));
    }

    #[test]
    fn explicit_duration_overrides_window_duration() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(10, 0), 30)];
        let slots =
            compute_available_slots(&windows, &[], monday(), Some(Duration::minutes(15)), None).unwrap();
        assert_eq!(slots.len(), 4);
    }

    #[test]
    fn cap_keeps_earliest_slots_across_windows() {
        let windows = vec![
            WorkingWindow::new(Weekday::Mon, t(14, 0), t(16, 0), 30),
            WorkingWindow::new(Weekday::Mon, t(9, 0), t(10, 0), 30),
        ];
        let slots = compute_available_slots(&windows, &[], monday(), None, Some(3)).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30), t(14, 0)]);

        let none = compute_available_slots(&windows, &[], monday(), None, Some(0)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn window_cap_applies_without_explicit_cap() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30).with_max_slots(2)];
        let slots = compute_available_slots(&windows, &[], monday(), None, None).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30)]);
    }

    #[test]
    fn requested_cap_cannot_exceed_window_cap() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30).with_max_slots(2)];
        let slots = compute_available_slots(&windows, &[], monday(), None, Some(100)).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30)]);

        let tighter = compute_available_slots(&windows, &[], monday(), None, Some(1)).unwrap();
        assert_eq!(starts(&tighter), vec![t(9, 0)]);
    }

    #[test]
    fn overlapping_windows_do_not_produce_overlapping_slots() {
        let windows = vec![
            WorkingWindow::new(Weekday::Mon, t(9, 0), t(10, 0), 30),
            WorkingWindow::new(Weekday::Mon, t(9, 15), t(10, 15), 30),
        ];
        let slots = compute_available_slots(&windows, &[], monday(), None, None).unwrap();
        for pair in slots.windows(2) {
            assert!(pair[0].end_time <= pair[1].start_time);
        }
        assert_eq!(starts(&slots), vec![t(9, 0), t(9, 30)]);
    }

    #[test]
    fn window_ending_near_midnight_does_not_wrap() {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(23, 0), end, 30)];
        let slots = compute_available_slots(&windows, &[], monday(), None, None).unwrap();
        assert_eq!(starts(&slots), vec![t(23, 0)]);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let inverted = vec![WorkingWindow::new(Weekday::Mon, t(12, 0), t(9, 0), 30)];
        assert!(matches!(
            compute_available_slots(&inverted, &[], monday(), None, None),
            Err(SchedulingError::Validation(_))
        ));

        let zero = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 0)];
        assert!(matches!(
            compute_available_slots(&zero, &[], monday(), None, None),
            Err(SchedulingError::Validation(_))
        ));

        let ok = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30)];
        assert!(matches!(
            compute_available_slots(&ok, &[], monday(), Some(Duration::zero()), None),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn within_working_hours_checks_weekday_and_bounds() {
        let windows = vec![WorkingWindow::new(Weekday::Mon, t(9, 0), t(12, 0), 30)];
        assert!(within_working_hours(&windows, &Slot::new(monday(), t(11, 30), t(12, 0)).unwrap()));
        assert!(!within_working_hours(&windows, &Slot::new(monday(), t(11, 45), t(12, 15)).unwrap()));
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(!within_working_hours(&windows, &Slot::new(tuesday, t(9, 0), t(9, 30)).unwrap()));
    }
}
