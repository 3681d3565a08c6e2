//! Slot computation and the date scanner.
//!
//! [`compute_slots`] and [`available_dates`] are pure: they take the rules,
//! the live bookings and the evaluation instant as arguments. The async
//! wrappers at the bottom load those inputs from the store.
//!
//! Candidates sit on a fixed 30 minute grid anchored at the start of the
//! working window. The grid does not bend around odd window ends or odd
//! booking lengths, so a window ending at 17:45 never offers anything that
//! would need the last 15 minutes.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use sqlx::SqliteConnection;

use crate::{
    bookings,
    schedule::{self, day_of_week, AvailabilityRule},
};

pub const SLOT_INTERVAL_MINUTES: i64 = 30;
/// Days after today covered by the scanner; today itself is offset 0.
pub const HORIZON_DAYS: i64 = 60;

/// An existing booking, expanded with the length of its own service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedSpan {
    start: i64,
    end: i64,
}

impl BookedSpan {
    pub fn new(start: NaiveTime, duration_minutes: i64) -> Self {
        let start = minute_of_day(start);
        Self {
            start,
            end: start + duration_minutes.max(0),
        }
    }

    /// Half-open intersection with `[start, end)`.
    fn overlaps(&self, start: i64, end: i64) -> bool {
        start < self.end && end > self.start
    }

    pub fn collides_with(&self, other: &BookedSpan) -> bool {
        self.overlaps(other.start, other.end)
    }
}

/// Minutes are counted as plain integers so a span running past midnight
/// does not wrap around.
fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

fn time_from_minutes(minutes: i64) -> Option<NaiveTime> {
    let minutes = u32::try_from(minutes).ok()?;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// The working window for `date`: none on a holiday, otherwise the first
/// weekly rule for that day of the week.
pub fn working_window(rules: &[AvailabilityRule], date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
    let holiday = rules
        .iter()
        .any(|rule| matches!(rule, AvailabilityRule::Holiday { date: day } if *day == date));
    if holiday {
        return None;
    }

    let weekday = day_of_week(date);
    rules.iter().find_map(|rule| match rule {
        AvailabilityRule::Weekly {
            day_of_week,
            start,
            end,
        } if *day_of_week == weekday => Some((*start, *end)),
        _ => None,
    })
}

/// Bookable start times for a stylist on `date`, ascending.
///
/// `now` is the caller's local wall-clock time. When `date` is the same
/// calendar day as `now`, only start times strictly after `now` survive.
/// Other dates, past ones included, are not filtered; rejecting those is up
/// to the caller.
pub fn compute_slots(
    rules: &[AvailabilityRule],
    booked: &[BookedSpan],
    date: NaiveDate,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    if duration_minutes <= 0 {
        return Vec::new();
    }
    let Some((window_start, window_end)) = working_window(rules, date) else {
        return Vec::new();
    };

    let window_end = minute_of_day(window_end);
    let is_today = now.date() == date;

    let mut slots = Vec::new();
    let mut candidate = minute_of_day(window_start);
    while candidate + duration_minutes <= window_end {
        let candidate_end = candidate + duration_minutes;
        let free = !booked
            .iter()
            .any(|span| span.overlaps(candidate, candidate_end));

        if free {
            if let Some(start) = time_from_minutes(candidate) {
                if !is_today || start > now.time() {
                    slots.push(start);
                }
            }
        }
        candidate += SLOT_INTERVAL_MINUTES;
    }
    slots
}

/// Dates from `today` through `today + HORIZON_DAYS` whose weekday has a
/// weekly rule and which are not holidays. Existing bookings are not looked
/// at, so a fully booked day is still listed.
pub fn available_dates(rules: &[AvailabilityRule], today: NaiveDate) -> Vec<NaiveDate> {
    let mut working_days = HashSet::new();
    let mut holidays = HashSet::new();
    for rule in rules {
        match rule {
            AvailabilityRule::Weekly { day_of_week, .. } => {
                working_days.insert(*day_of_week);
            }
            AvailabilityRule::Holiday { date } => {
                holidays.insert(*date);
            }
        }
    }

    (0..=HORIZON_DAYS)
        .map(|offset| today + Duration::days(offset))
        .filter(|date| working_days.contains(&day_of_week(*date)) && !holidays.contains(date))
        .collect()
}

/// Loads the stylist's rules and live bookings and runs [`compute_slots`].
///
/// Takes a connection rather than the pool so admission can run it inside
/// its write transaction.
pub async fn slots_for(
    conn: &mut SqliteConnection,
    stylist_id: &str,
    date: NaiveDate,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> Result<Vec<NaiveTime>, sqlx::Error> {
    let rules = schedule::rules_for(&mut *conn, stylist_id).await?;
    if working_window(&rules, date).is_none() {
        return Ok(Vec::new());
    }
    let booked = bookings::occupied_spans(&mut *conn, stylist_id, date).await?;
    Ok(compute_slots(&rules, &booked, date, duration_minutes, now))
}

pub async fn dates_for(
    conn: &mut SqliteConnection,
    stylist_id: &str,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>, sqlx::Error> {
    let rules = schedule::rules_for(&mut *conn, stylist_id).await?;
    Ok(available_dates(&rules, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::format_time;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn weekly(day: u32, start: NaiveTime, end: NaiveTime) -> AvailabilityRule {
        AvailabilityRule::Weekly {
            day_of_week: day,
            start,
            end,
        }
    }

    /// An instant well before any date the tests query.
    fn long_ago() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn labels(slots: &[NaiveTime]) -> Vec<String> {
        slots.iter().map(|slot| format_time(*slot)).collect()
    }

    #[test]
    fn full_open_day_yields_eighteen_half_hour_slots() {
        let rules = vec![weekly(1, t(9, 0), t(18, 0))];
        let slots = labels(&compute_slots(&rules, &[], monday(), 30, long_ago()));

        assert_eq!(slots.len(), 18);
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("17:30"));
        assert!(!slots.contains(&"18:00".to_string()));
    }

    #[test]
    fn booked_time_is_excluded_for_overlapping_durations() {
        let rules = vec![weekly(1, t(9, 0), t(18, 0))];
        let booked = vec![BookedSpan::new(t(10, 0), 30)];

        for duration in [30, 45, 60, 90] {
            let slots = compute_slots(&rules, &booked, monday(), duration, long_ago());
            assert!(!slots.contains(&t(10, 0)), "duration {duration}");
            for slot in &slots {
                let start = minute_of_day(*slot);
                assert!(
                    !booked[0].overlaps(start, start + duration),
                    "{slot} overlaps with duration {duration}"
                );
            }
        }

        // Back-to-back is fine: 09:00-10:00 ends exactly when the booking starts.
        let hour_long = compute_slots(&rules, &booked, monday(), 60, long_ago());
        assert!(hour_long.contains(&t(9, 0)));
        assert!(!hour_long.contains(&t(9, 30)));
        assert!(hour_long.contains(&t(10, 30)));
    }

    #[test]
    fn existing_booking_uses_its_own_duration() {
        let rules = vec![weekly(1, t(9, 0), t(12, 0))];
        // A 90 minute colouring at 09:00 blocks 09:00 through 10:29.
        let booked = vec![BookedSpan::new(t(9, 0), 90)];
        let slots = labels(&compute_slots(&rules, &booked, monday(), 30, long_ago()));
        assert_eq!(slots, vec!["10:30", "11:00", "11:30"]);
    }

    #[test]
    fn off_grid_booking_blocks_both_neighbouring_candidates() {
        let rules = vec![weekly(1, t(9, 0), t(11, 0))];
        let booked = vec![BookedSpan::new(t(9, 15), 20)];
        let slots = labels(&compute_slots(&rules, &booked, monday(), 30, long_ago()));
        assert_eq!(slots, vec!["10:00", "10:30"]);
    }

    #[test]
    fn holiday_beats_weekly_rule() {
        let rules = vec![
            weekly(1, t(9, 0), t(18, 0)),
            AvailabilityRule::Holiday { date: monday() },
        ];
        assert!(compute_slots(&rules, &[], monday(), 30, long_ago()).is_empty());

        let next_monday = monday() + Duration::days(7);
        assert_eq!(compute_slots(&rules, &[], next_monday, 30, long_ago()).len(), 18);
    }

    #[test]
    fn day_without_rule_is_empty() {
        let rules = vec![weekly(2, t(9, 0), t(18, 0))];
        assert!(compute_slots(&rules, &[], monday(), 30, long_ago()).is_empty());
        assert!(compute_slots(&[], &[], monday(), 30, long_ago()).is_empty());
    }

    #[test]
    fn first_weekly_rule_for_a_day_wins() {
        let rules = vec![weekly(1, t(9, 0), t(10, 0)), weekly(1, t(13, 0), t(17, 0))];
        let slots = labels(&compute_slots(&rules, &[], monday(), 30, long_ago()));
        assert_eq!(slots, vec!["09:00", "09:30"]);
    }

    #[test]
    fn long_service_drops_tail_candidates() {
        let rules = vec![weekly(1, t(9, 0), t(18, 0))];
        let short = compute_slots(&rules, &[], monday(), 30, long_ago());
        let long = compute_slots(&rules, &[], monday(), 90, long_ago());

        assert_eq!(labels(&long).last().map(String::as_str), Some("16:30"));
        for tail in [t(17, 0), t(17, 30)] {
            assert!(short.contains(&tail));
            assert!(!long.contains(&tail));
        }
    }

    #[test]
    fn odd_window_end_leaves_a_dead_zone() {
        let rules = vec![weekly(1, t(9, 0), t(17, 45))];
        let slots = labels(&compute_slots(&rules, &[], monday(), 30, long_ago()));
        assert_eq!(slots.last().map(String::as_str), Some("17:00"));
        assert_eq!(slots.len(), 17);
    }

    #[test]
    fn every_slot_is_on_grid_and_fits_the_window() {
        let rules = vec![weekly(1, t(9, 15), t(16, 50))];
        let booked = vec![BookedSpan::new(t(11, 0), 45), BookedSpan::new(t(14, 10), 25)];
        for duration in [20, 30, 45, 60, 75, 120] {
            for slot in compute_slots(&rules, &booked, monday(), duration, long_ago()) {
                let start = minute_of_day(slot);
                assert_eq!((start - minute_of_day(t(9, 15))) % SLOT_INTERVAL_MINUTES, 0);
                assert!(start + duration <= minute_of_day(t(16, 50)));
            }
        }
    }

    #[test]
    fn today_only_offers_future_start_times() {
        let rules = vec![weekly(1, t(9, 0), t(18, 0))];
        let now = monday().and_hms_opt(12, 0, 0).unwrap();
        let slots = compute_slots(&rules, &[], monday(), 30, now);
        assert_eq!(labels(&slots).first().map(String::as_str), Some("12:30"));
        assert!(slots.iter().all(|slot| *slot > now.time()));

        let just_before = monday().and_hms_opt(11, 59, 59).unwrap();
        let slots = compute_slots(&rules, &[], monday(), 30, just_before);
        assert_eq!(labels(&slots).first().map(String::as_str), Some("12:00"));

        let after_close = monday().and_hms_opt(19, 0, 0).unwrap();
        assert!(compute_slots(&rules, &[], monday(), 30, after_close).is_empty());
    }

    #[test]
    fn other_days_ignore_the_clock() {
        let rules = vec![weekly(1, t(9, 0), t(18, 0))];
        let sunday_evening = (monday() - Duration::days(1)).and_hms_opt(23, 0, 0).unwrap();
        assert_eq!(compute_slots(&rules, &[], monday(), 30, sunday_evening).len(), 18);
    }

    #[test]
    fn non_positive_duration_has_no_slots() {
        let rules = vec![weekly(1, t(9, 0), t(18, 0))];
        assert!(compute_slots(&rules, &[], monday(), 0, long_ago()).is_empty());
        assert!(compute_slots(&rules, &[], monday(), -30, long_ago()).is_empty());
    }

    #[test]
    fn late_booking_past_midnight_does_not_wrap() {
        let rules = vec![weekly(1, t(22, 0), t(23, 59))];
        let booked = vec![BookedSpan::new(t(23, 0), 120)];
        let slots = labels(&compute_slots(&rules, &booked, monday(), 30, long_ago()));
        assert_eq!(slots, vec!["22:00", "22:30"]);
    }

    #[test]
    fn scanner_covers_sixty_one_days_of_working_weekdays() {
        let rules: Vec<_> = (1..=7).map(|day| weekly(day, t(9, 0), t(17, 0))).collect();
        let dates = available_dates(&rules, monday());
        assert_eq!(dates.len(), 61);
        assert_eq!(dates.first(), Some(&monday()));
        assert_eq!(dates.last(), Some(&(monday() + Duration::days(60))));
    }

    #[test]
    fn scanner_skips_off_days_and_holidays() {
        let holiday = monday() + Duration::days(7);
        let rules = vec![
            weekly(1, t(9, 0), t(17, 0)),
            AvailabilityRule::Holiday { date: holiday },
        ];
        let dates = available_dates(&rules, monday());
        assert!(dates.iter().all(|date| day_of_week(*date) == 1));
        assert!(!dates.contains(&holiday));
        assert!(dates.contains(&monday()));
        // Mondays in [monday, monday + 60]: 9, minus the holiday.
        assert_eq!(dates.len(), 8);
    }

    #[test]
    fn scanner_lists_days_the_engine_finds_full() {
        let rules = vec![weekly(1, t(9, 0), t(10, 0))];
        let booked = vec![BookedSpan::new(t(9, 0), 60)];
        assert!(available_dates(&rules, monday()).contains(&monday()));
        assert!(compute_slots(&rules, &booked, monday(), 30, long_ago()).is_empty());
    }
}
