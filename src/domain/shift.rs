//! Shift domain model
//!
//! A shift is one staff member's block of work on one day. Its canonical
//! fields (date, times, kind, subject) are the approved values; an edit to an
//! approved shift travels separately as a [`ShiftDelta`] until it is approved.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::{ResourceId, ShiftId};

/// Violations of the half-open interval rules
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntervalError {
    #[error("Start time {start} must be before end time {end}")]
    EmptyInterval { start: NaiveTime, end: NaiveTime },

    #[error("Class slot {slot} lies outside the shift {shift}")]
    SlotOutsideShift { slot: TimeRange, shift: TimeRange },

    #[error("Class slots {first} and {second} overlap")]
    OverlappingSlots { first: TimeRange, second: TimeRange },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid time of day '{0}': expected HH:MM")]
    Time(String),

    #[error("Invalid time range '{0}': expected HH:MM-HH:MM")]
    Range(String),

    #[error("Unknown {kind}: '{value}'")]
    Unknown { kind: &'static str, value: String },
}

/// Parses `HH:MM` (a single-digit hour is accepted). Seconds are rejected.
pub fn parse_time(s: &str) -> Result<NaiveTime, ParseError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| ParseError::Time(s.to_string()))
}

/// Parses a stored time: `HH:MM`, or `HH:MM:SS` as written for times
/// that carry seconds
pub fn parse_stored_time(s: &str) -> Result<NaiveTime, ParseError> {
    parse_time(s).or_else(|e| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").map_err(|_| e))
}

/// Serde adapter storing a time of day as `"HH:MM"`.
///
/// A time with seconds is written as `"HH:MM:SS"` so nothing is truncated.
pub mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format(time))
    }

    fn format(time: &NaiveTime) -> String {
        if time.second() == 0 && time.nanosecond() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S%.f").to_string()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_stored_time(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.collect_str(&super::format(t)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_stored_time(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// A half-open time-of-day interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl TimeRange {
    /// Creates a range, rejecting `start >= end`
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Result<Self, IntervalError> {
        if start_time >= end_time {
            return Err(IntervalError::EmptyInterval {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Whether two ranges share any instant. Touching endpoints do not.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    /// Whether `other` lies entirely inside this range
    pub fn contains(&self, other: &Self) -> bool {
        other.start_time >= self.start_time && other.end_time <= self.end_time
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

impl FromStr for TimeRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| ParseError::Range(s.to_string()))?;
        let start = parse_time(start)?;
        let end = parse_time(end)?;
        TimeRange::new(start, end).map_err(|_| ParseError::Range(s.to_string()))
    }
}

/// What kind of work the shift covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    #[default]
    StaffDuty,
    ClassSession,
}

impl ShiftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftKind::StaffDuty => "staff_duty",
            ShiftKind::ClassSession => "class_session",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "staff_duty" => Ok(ShiftKind::StaffDuty),
            "class_session" => Ok(ShiftKind::ClassSession),
            _ => Err(ParseError::Unknown {
                kind: "shift kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
    DeletionRequested,
    Deleted,
    Completed,
    Purged,
}

impl ShiftStatus {
    pub const ALL: [ShiftStatus; 8] = [
        ShiftStatus::Draft,
        ShiftStatus::Pending,
        ShiftStatus::Approved,
        ShiftStatus::Rejected,
        ShiftStatus::DeletionRequested,
        ShiftStatus::Deleted,
        ShiftStatus::Completed,
        ShiftStatus::Purged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Draft => "draft",
            ShiftStatus::Pending => "pending",
            ShiftStatus::Approved => "approved",
            ShiftStatus::Rejected => "rejected",
            ShiftStatus::DeletionRequested => "deletion_requested",
            ShiftStatus::Deleted => "deleted",
            ShiftStatus::Completed => "completed",
            ShiftStatus::Purged => "purged",
        }
    }

    /// Returns true for deleted and purged records
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShiftStatus::Deleted | ShiftStatus::Purged)
    }

    /// Returns true if the shift shows up in normal listings and the timeline
    pub fn is_visible(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if a privileged actor has a decision to make
    pub fn awaits_approval(&self) -> bool {
        matches!(self, ShiftStatus::Pending | ShiftStatus::DeletionRequested)
    }

    /// Statuses in which a pending delta may be carried
    pub fn allows_requested_change(&self) -> bool {
        matches!(
            self,
            ShiftStatus::Draft | ShiftStatus::Pending | ShiftStatus::DeletionRequested
        )
    }
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        ShiftStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseError::Unknown {
                kind: "shift status",
                value: s.to_string(),
            })
    }
}

/// A proposed change to a shift's canonical fields. Absent fields keep their
/// current value when the change is merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "hhmm::option")]
    pub start_time: Option<NaiveTime>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "hhmm::option")]
    pub end_time: Option<NaiveTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ShiftKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl ShiftDelta {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.kind.is_none()
            && self.subject.is_none()
    }
}

/// Caller-supplied fields for a new shift. Status and timestamps are never
/// taken from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShift {
    pub resource_id: ResourceId,
    pub display_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub kind: ShiftKind,
    pub subject: Option<String>,
    pub class_slots: Vec<TimeRange>,
}

/// A shift record as stored and exchanged with the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRecord {
    /// Unique identifier
    pub id: ShiftId,

    /// The staff member the shift is assigned to
    pub resource_id: ResourceId,

    /// Name shown on the timeline
    pub display_name: String,

    /// Calendar day of the shift
    pub date: NaiveDate,

    /// Start of the half-open interval
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,

    /// End of the half-open interval
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,

    pub kind: ShiftKind,

    /// Lesson subject, only meaningful for class sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    pub status: ShiftStatus,

    /// Sub-periods within the shift, ordered by start
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_slots: Vec<TimeRange>,

    /// Change awaiting approval
    #[serde(default)]
    pub requested_change: Option<ShiftDelta>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ShiftRecord {
    /// The canonical interval of the shift
    pub fn interval(&self) -> TimeRange {
        TimeRange {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// The instant the shift ends
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    /// Returns true while an edit of an approved shift is in flight
    pub fn has_requested_change(&self) -> bool {
        self.requested_change.is_some()
    }

    /// Checks the interval invariants of the canonical fields
    pub fn validate(&self) -> Result<(), IntervalError> {
        validate_intervals(self.start_time, self.end_time, &self.class_slots)
    }

    /// Returns the record with `delta` applied field by field.
    ///
    /// The result is not validated; callers decide which error a violation maps to.
    pub fn merged_with(&self, delta: &ShiftDelta) -> ShiftRecord {
        let mut merged = self.clone();
        if let Some(date) = delta.date {
            merged.date = date;
        }
        if let Some(start) = delta.start_time {
            merged.start_time = start;
        }
        if let Some(end) = delta.end_time {
            merged.end_time = end;
        }
        if let Some(kind) = delta.kind {
            merged.kind = kind;
        }
        if let Some(subject) = &delta.subject {
            merged.subject = Some(subject.clone());
        }
        merged.normalize_subject();
        merged
    }

    /// Drops the subject from anything that is not a class session
    pub(crate) fn normalize_subject(&mut self) {
        if self.kind != ShiftKind::ClassSession {
            self.subject = None;
        }
    }
}

/// Checks `start < end`, that every slot lies inside `[start, end)`, and that
/// slots are pairwise disjoint. `slots` must be sorted by start.
pub fn validate_intervals(
    start: NaiveTime,
    end: NaiveTime,
    slots: &[TimeRange],
) -> Result<(), IntervalError> {
    let shift = TimeRange::new(start, end)?;

    for slot in slots {
        TimeRange::new(slot.start_time, slot.end_time)?;
        if !shift.contains(slot) {
            return Err(IntervalError::SlotOutsideShift { slot: *slot, shift });
        }
    }

    for pair in slots.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(IntervalError::OverlappingSlots {
                first: pair[0],
                second: pair[1],
            });
        }
    }

    Ok(())
}
