//! Business-day calendar used by lookback probes

use chrono::{Datelike, NaiveDate, Weekday};

/// Calendar of working days: Monday through Friday minus configured holidays
///
/// The holiday list is plain data supplied by the caller; resolving a
/// jurisdiction's official holidays is a configuration concern, not a
/// core one.
#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar {
    holidays: Vec<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: Vec<NaiveDate>) -> Self {
        Self { holidays }
    }

    /// Monday to Friday and not a configured holiday
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !self.holidays.contains(&date)
    }

    /// The date itself when it is a business day, otherwise the closest
    /// earlier one. Bounded to a 10-day walk.
    pub fn last_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        let mut attempts = 0;
        while !self.is_business_day(current) && attempts < 10 {
            current = current - chrono::Duration::days(1);
            attempts += 1;
        }
        current
    }

    /// Business days strictly before `date` within a calendar-day window,
    /// most recent first
    pub fn business_days_before(&self, date: NaiveDate, window_days: u32) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        for offset in 1..=i64::from(window_days) {
            let candidate = date - chrono::Duration::days(offset);
            if self.is_business_day(candidate) {
                days.push(candidate);
            }
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekends_are_not_business_days() {
        let calendar = BusinessCalendar::new();
        assert!(calendar.is_business_day(date(2025, 11, 28))); // Friday
        assert!(!calendar.is_business_day(date(2025, 11, 29))); // Saturday
        assert!(!calendar.is_business_day(date(2025, 11, 30))); // Sunday
    }

    #[test]
    fn holidays_are_skipped() {
        let calendar = BusinessCalendar::with_holidays(vec![date(2025, 12, 8)]); // Monday holiday
        assert!(!calendar.is_business_day(date(2025, 12, 8)));
        assert_eq!(
            calendar.last_business_day(date(2025, 12, 8)),
            date(2025, 12, 5)
        );
    }

    #[test]
    fn last_business_day_rolls_back_over_weekend() {
        let calendar = BusinessCalendar::new();
        assert_eq!(
            calendar.last_business_day(date(2025, 11, 30)), // Sunday
            date(2025, 11, 28)                              // previous Friday
        );
    }

    #[test]
    fn lookback_window_lists_business_days_most_recent_first() {
        let calendar = BusinessCalendar::new();
        // Monday 2025-12-01 with a 4-day window reaches back across the weekend
        let days = calendar.business_days_before(date(2025, 12, 1), 4);
        assert_eq!(days, vec![date(2025, 11, 28), date(2025, 11, 27)]);
    }
}
