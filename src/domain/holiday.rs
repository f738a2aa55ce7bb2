//! Holiday calendar
//!
//! Marks non-working days on the timeline. Holidays never change what the
//! lifecycle engine allows.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolidayCalendar(BTreeMap<NaiveDate, String>);

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a calendar from `"YYYY-MM-DD" -> label` pairs.
    ///
    /// Returns the first key that is not a valid date.
    pub fn from_labels(labels: &HashMap<String, String>) -> Result<Self, String> {
        let mut days = BTreeMap::new();
        for (key, label) in labels {
            let date = NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").map_err(|_| key.clone())?;
            days.insert(date, label.clone());
        }
        Ok(Self(days))
    }

    pub fn insert(&mut self, date: NaiveDate, label: impl Into<String>) {
        self.0.insert(date, label.into());
    }

    /// The holiday label for a day, if any
    pub fn label(&self, date: NaiveDate) -> Option<&str> {
        self.0.get(&date).map(String::as_str)
    }

    /// Holidays between `from` and `to`, both inclusive
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = (&NaiveDate, &String)> {
        self.0.range(from..=to)
    }
}
