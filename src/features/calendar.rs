//! Calendar features from proleptic Gregorian dates.

use chrono::{Datelike, NaiveDate};

use crate::domain::CalendarFeatures;

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day_of_month: date.day(),
            day_of_week: date.weekday().num_days_from_monday(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_is_zero_and_sunday_is_six() {
        // 2018-08-27 was a Monday.
        let monday = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2018, 8, 27).unwrap());
        assert_eq!(monday.day_of_week, 0);
        let sunday = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2018, 8, 26).unwrap());
        assert_eq!(sunday.day_of_week, 6);
        assert_eq!((sunday.year, sunday.month, sunday.day_of_month), (2018, 8, 26));
    }

    #[test]
    fn leap_day() {
        let f = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2016, 2, 29).unwrap());
        assert_eq!((f.month, f.day_of_month, f.day_of_week), (2, 29, 0));
    }
}
