//! Pure schedule arithmetic. No clock access, no side effects.

use chrono::{DateTime, Duration, Months, Utc};
use model::entities::transaction::RecurringInterval;

/// Maps an anchor date and an interval to the next occurrence date.
///
/// Month and year steps use calendar arithmetic: the day-of-month is
/// preserved where it exists in the target month and clamped to the last
/// day otherwise (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap year;
/// Feb 29 + 1 year = Feb 28). The time of day is always preserved.
pub fn next_occurrence(anchor: DateTime<Utc>, interval: RecurringInterval) -> DateTime<Utc> {
    match interval {
        RecurringInterval::Daily => anchor + Duration::days(1),
        RecurringInterval::Weekly => anchor + Duration::days(7),
        RecurringInterval::Monthly => add_months(anchor, 1),
        RecurringInterval::Yearly => add_months(anchor, 12),
    }
}

/// Seeds a template's first `next_recurring_date` at write time: the naive
/// next occurrence of the anchor, unless that is already in the past, in
/// which case the schedule restarts from the current moment.
pub fn seed_next_recurring_date(
    anchor: DateTime<Utc>,
    interval: RecurringInterval,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let naive = next_occurrence(anchor, interval);
    if naive < now {
        next_occurrence(now, interval)
    } else {
        naive
    }
}

fn add_months(anchor: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    // Only fails past chrono's representable range (year ~262000), far
    // beyond any schedulable date.
    anchor
        .checked_add_months(Months::new(months))
        .expect("date beyond chrono's representable range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 8, 30, 0).unwrap()
    }

    #[test]
    fn daily_advances_one_day() {
        assert_eq!(
            next_occurrence(utc(2024, 1, 1), RecurringInterval::Daily),
            utc(2024, 1, 2)
        );
    }

    #[test]
    fn weekly_advances_seven_days() {
        assert_eq!(
            next_occurrence(utc(2024, 1, 25), RecurringInterval::Weekly),
            utc(2024, 2, 1)
        );
    }

    #[test]
    fn monthly_preserves_day_of_month() {
        assert_eq!(
            next_occurrence(utc(2024, 3, 15), RecurringInterval::Monthly),
            utc(2024, 4, 15)
        );
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        // Jan 31 + 1 month lands on the last day of February.
        assert_eq!(
            next_occurrence(utc(2023, 1, 31), RecurringInterval::Monthly),
            utc(2023, 2, 28)
        );
        assert_eq!(
            next_occurrence(utc(2024, 1, 31), RecurringInterval::Monthly),
            utc(2024, 2, 29)
        );
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(
            next_occurrence(utc(2024, 2, 29), RecurringInterval::Yearly),
            utc(2025, 2, 28)
        );
    }

    #[test]
    fn yearly_advances_one_year() {
        assert_eq!(
            next_occurrence(utc(2024, 6, 1), RecurringInterval::Yearly),
            utc(2025, 6, 1)
        );
    }

    #[test]
    fn preserves_time_of_day() {
        let anchor = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let next = next_occurrence(anchor, RecurringInterval::Monthly);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap());
    }

    #[test]
    fn is_deterministic_for_the_same_inputs() {
        let anchor = utc(2024, 1, 31);
        assert_eq!(
            next_occurrence(anchor, RecurringInterval::Monthly),
            next_occurrence(anchor, RecurringInterval::Monthly)
        );
    }

    #[test]
    fn seeding_keeps_a_future_occurrence() {
        let now = utc(2024, 1, 1);
        let anchor = utc(2024, 1, 10);
        assert_eq!(
            seed_next_recurring_date(anchor, RecurringInterval::Daily, now),
            utc(2024, 1, 11)
        );
    }

    #[test]
    fn seeding_restarts_from_now_when_overdue() {
        // The anchor's naive next occurrence (Jan 2) is already past, so the
        // schedule restarts from the current moment instead.
        let now = utc(2024, 3, 1);
        let anchor = utc(2024, 1, 1);
        assert_eq!(
            seed_next_recurring_date(anchor, RecurringInterval::Daily, now),
            utc(2024, 3, 2)
        );
    }
}
