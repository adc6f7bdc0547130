//! Holiday name canonicalization and per-date lookup.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{HolidayCalendar, HolidayRegion};

/// Known variant → canonical pairs for British Columbia.
const BC_CANONICAL: [(&str, &str); 2] = [
    ("Canada Day (observed)", "Canada Day"),
    ("New Year's Day", "New Year Day"),
];

/// Known variant → canonical pairs for Washington.
const WA_CANONICAL: [(&str, &str); 5] = [
    ("Christmas Day (in lieu)", "Christmas Day"),
    ("New Year's Day", "New Years Day"),
    ("Independence Day (observed)", "Independence Day"),
    ("New Years Day Holiday", "New Years Day"),
    ("Veterans Day (observed)", "Veterans Day"),
];

/// Fold an observed-date or alternate spelling into its canonical name.
pub fn canonical_name(region: HolidayRegion, raw: &str) -> &str {
    let table: &[(&str, &str)] = match region {
        HolidayRegion::Bc => &BC_CANONICAL,
        HolidayRegion::Wa => &WA_CANONICAL,
    };
    table
        .iter()
        .find(|(variant, _)| *variant == raw)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(raw)
}

/// Date → canonical holiday name for one region.
#[derive(Debug, Clone)]
pub struct HolidayIndex {
    pub region: HolidayRegion,
    by_date: HashMap<NaiveDate, String>,
}

impl HolidayIndex {
    pub fn new(calendar: &HolidayCalendar) -> Self {
        let mut by_date = HashMap::new();
        let mut duplicates = 0usize;
        for record in &calendar.records {
            let Some(name) = record.name.as_deref() else {
                continue;
            };
            if by_date.contains_key(&record.date) {
                duplicates += 1;
                continue;
            }
            by_date.insert(record.date, canonical_name(calendar.region, name).to_string());
        }
        if duplicates > 0 {
            log::debug!(
                "{} holiday calendar: kept first entry on {duplicates} duplicate date(s)",
                calendar.region.display_name()
            );
        }
        Self {
            region: calendar.region,
            by_date,
        }
    }

    pub fn lookup(&self, date: NaiveDate) -> Option<&str> {
        self.by_date.get(&date).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
