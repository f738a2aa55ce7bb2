//! Timeline layout
//!
//! Assigns each shift of one resource's day to a lane so that shifts sharing a
//! lane never overlap, then maps times onto the timeline window as fractional
//! step offsets.
//!
//! ## Lanes
//!
//! Shifts are swept in start order (ties by ID) and placed into the
//! lowest-indexed lane that is free at their start. Because intervals are
//! half-open, a shift ending at 10:00 frees its lane for one starting at
//! 10:00. Sweeping in start order makes the lane count equal to the largest
//! number of shifts running at the same instant.
//!
//! ## Offsets
//!
//! A time `t` maps to `(t - window.start) / step`, clamped to the window.
//! Shifts reaching outside the window are clipped at its edges, never
//! dropped. Offsets are not rounded here.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use super::holiday::HolidayCalendar;
use super::id::{ResourceId, ShiftId};
use super::shift::{hhmm, ShiftRecord, TimeRange};

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Timeline window start {start} must be before its end {end}")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },

    #[error("Timeline step must be a positive number of minutes")]
    ZeroStep,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// The visible span of the timeline and its resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutWindow {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
    step_minutes: u32,
}

impl Default for LayoutWindow {
    /// 09:00 to 22:00 in 30-minute steps
    fn default() -> Self {
        Self {
            start: hm(9, 0),
            end: hm(22, 0),
            step_minutes: 30,
        }
    }
}

impl LayoutWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, step_minutes: u32) -> Result<Self, LayoutError> {
        if start >= end {
            return Err(LayoutError::EmptyWindow { start, end });
        }
        if step_minutes == 0 {
            return Err(LayoutError::ZeroStep);
        }
        Ok(Self {
            start,
            end,
            step_minutes,
        })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    /// Width of the window in steps (may be fractional)
    pub fn step_count(&self) -> f64 {
        self.steps_from_start(self.end)
    }

    fn steps_from_start(&self, time: NaiveTime) -> f64 {
        let seconds = time.signed_duration_since(self.start).num_seconds() as f64;
        seconds / (f64::from(self.step_minutes) * 60.0)
    }

    /// Position of `time` in steps from the window start, clamped to the window
    pub fn offset(&self, time: NaiveTime) -> f64 {
        self.steps_from_start(time).clamp(0.0, self.step_count())
    }

    /// Returns true if `range` reaches outside the window
    pub fn clips(&self, range: &TimeRange) -> bool {
        range.start_time < self.start || range.end_time > self.end
    }
}

/// Where one shift sits on the timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub shift_id: ShiftId,
    pub lane: usize,
    pub start_offset: f64,
    pub end_offset: f64,
    /// The shift reaches outside the window and was cut at its edge
    pub clipped: bool,
}

/// A class slot drawn over its parent shift's lane
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPlacement {
    pub shift_id: ShiftId,
    pub slot_index: usize,
    pub lane: usize,
    pub start_offset: f64,
    pub end_offset: f64,
}

/// Layout of one resource's shifts on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLayout {
    pub date: NaiveDate,
    pub resource_id: ResourceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holiday: Option<String>,
    pub lane_count: usize,
    /// In sweep order: start time, then ID
    pub placements: Vec<Placement>,
    pub slots: Vec<SlotPlacement>,
}

/// Lays out `resource`'s shifts on `date`.
///
/// Records for other days or resources, and deleted or purged records, are
/// ignored.
pub fn layout_day(
    date: NaiveDate,
    resource: &ResourceId,
    records: &[ShiftRecord],
    window: &LayoutWindow,
    holidays: &HolidayCalendar,
) -> DayLayout {
    let mut shifts: Vec<&ShiftRecord> = records
        .iter()
        .filter(|r| r.date == date && &r.resource_id == resource && r.status.is_visible())
        .collect();
    shifts.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });

    // End time of the last shift placed in each lane
    let mut lane_ends: Vec<NaiveTime> = Vec::new();
    let mut placements = Vec::with_capacity(shifts.len());
    let mut slots = Vec::new();

    for shift in shifts {
        let lane = match lane_ends.iter().position(|end| *end <= shift.start_time) {
            Some(lane) => {
                lane_ends[lane] = shift.end_time;
                lane
            }
            None => {
                lane_ends.push(shift.end_time);
                lane_ends.len() - 1
            }
        };

        placements.push(Placement {
            shift_id: shift.id.clone(),
            lane,
            start_offset: window.offset(shift.start_time),
            end_offset: window.offset(shift.end_time),
            clipped: window.clips(&shift.interval()),
        });

        slots.extend(
            shift
                .class_slots
                .iter()
                .enumerate()
                .map(|(slot_index, slot)| SlotPlacement {
                    shift_id: shift.id.clone(),
                    slot_index,
                    lane,
                    start_offset: window.offset(slot.start_time),
                    end_offset: window.offset(slot.end_time),
                }),
        );
    }

    DayLayout {
        date,
        resource_id: resource.clone(),
        holiday: holidays.label(date).map(str::to_string),
        lane_count: lane_ends.len(),
        placements,
        slots,
    }
}

/// Lays out every resource that has a visible shift on `date`, ordered by
/// resource ID
pub fn layout_board(
    records: &[ShiftRecord],
    date: NaiveDate,
    window: &LayoutWindow,
    holidays: &HolidayCalendar,
) -> Vec<DayLayout> {
    let mut by_resource: BTreeMap<&ResourceId, Vec<ShiftRecord>> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| r.date == date && r.status.is_visible())
    {
        by_resource
            .entry(&record.resource_id)
            .or_default()
            .push(record.clone());
    }

    by_resource
        .into_iter()
        .map(|(resource, shifts)| layout_day(date, resource, &shifts, window, holidays))
        .collect()
}

/// The largest number of ranges covering a single instant
pub fn max_overlap(ranges: &[TimeRange]) -> usize {
    // (time, delta); ends sort before starts at the same instant
    let mut events: Vec<(NaiveTime, i32)> = ranges
        .iter()
        .flat_map(|r| [(r.start_time, 1), (r.end_time, -1)])
        .collect();
    events.sort();

    let mut current = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak as usize
}
