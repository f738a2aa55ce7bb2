//! Queries over shift records
//!
//! Pure filters returning sorted, owned snapshots. Callers re-run them
//! whenever they need a fresh view; nothing here caches or watches.
//!
//! Deleted and purged records are excluded unless [`QueryOptions::include_deleted`]
//! is set, which re-admits `deleted` for audit views. Purged records never
//! appear.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::actor::Actor;
use super::id::ResourceId;
use super::shift::{ShiftRecord, ShiftStatus};

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Invalid period {year}-{month:02}: month must be between 1 and 12")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("Invalid period '{0}': expected YYYY-MM")]
    Parse(String),
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    first: NaiveDate,
    last: NaiveDate,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidPeriod { year, month };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let last = next_first
            .and_then(|d| d.pred_opt())
            .ok_or_else(invalid)?;
        Ok(Self { first, last })
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    /// Inclusive of both the first and last day
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Period {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || QueryError::Parse(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(parse_err)?;
        let year: i32 = year.parse().map_err(|_| parse_err())?;
        let month: u32 = month.parse().map_err(|_| parse_err())?;
        Period::new(year, month)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Also return `deleted` records (audit views)
    pub include_deleted: bool,
}

impl QueryOptions {
    pub fn audit() -> Self {
        Self {
            include_deleted: true,
        }
    }

    pub fn admits(&self, status: ShiftStatus) -> bool {
        status.is_visible() || (self.include_deleted && status == ShiftStatus::Deleted)
    }
}

/// Orders by date, then start time, then ID
pub fn sort_records(records: &mut [ShiftRecord]) {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start_time.cmp(&b.start_time))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn collect_sorted<'a>(records: impl Iterator<Item = &'a ShiftRecord>) -> Vec<ShiftRecord> {
    let mut out: Vec<ShiftRecord> = records.cloned().collect();
    sort_records(&mut out);
    out
}

/// Records dated within `period`
pub fn for_period(records: &[ShiftRecord], period: &Period, opts: QueryOptions) -> Vec<ShiftRecord> {
    collect_sorted(
        records
            .iter()
            .filter(|r| opts.admits(r.status) && period.contains(r.date)),
    )
}

/// Records `actor` is allowed to see: everything for privileged and system
/// actors, only their own shifts for staff
pub fn visible_to(records: &[ShiftRecord], actor: &Actor, opts: QueryOptions) -> Vec<ShiftRecord> {
    collect_sorted(
        records
            .iter()
            .filter(|r| opts.admits(r.status) && actor.may_act_for(&r.resource_id)),
    )
}

/// Records waiting on a privileged decision (pending or deletion requested)
pub fn awaiting_approval(records: &[ShiftRecord]) -> Vec<ShiftRecord> {
    collect_sorted(records.iter().filter(|r| r.status.awaits_approval()))
}

/// Groups visible records per day and resource, the unit the timeline lays out
pub fn by_day_and_resource(
    records: &[ShiftRecord],
) -> BTreeMap<(NaiveDate, ResourceId), Vec<ShiftRecord>> {
    let mut groups: BTreeMap<(NaiveDate, ResourceId), Vec<ShiftRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.status.is_visible()) {
        groups
            .entry((record.date, record.resource_id.clone()))
            .or_default()
            .push(record.clone());
    }
    for group in groups.values_mut() {
        sort_records(group);
    }
    groups
}

/// Number of records in each status, in lifecycle order, skipping zeros
pub fn count_by_status(records: &[ShiftRecord]) -> Vec<(ShiftStatus, usize)> {
    ShiftStatus::ALL
        .into_iter()
        .map(|status| (status, records.iter().filter(|r| r.status == status).count()))
        .filter(|(_, count)| *count > 0)
        .collect()
}

/// Selection passed to a store's `fetch_shifts`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShiftFilter {
    pub resource: Option<ResourceId>,
    pub period: Option<Period>,
    pub options: QueryOptions,
}

impl ShiftFilter {
    /// Every visible record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_resource(mut self, resource: ResourceId) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn in_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    pub fn including_deleted(mut self) -> Self {
        self.options.include_deleted = true;
        self
    }

    pub fn matches(&self, record: &ShiftRecord) -> bool {
        self.options.admits(record.status)
            && self.resource.as_ref().map_or(true, |r| r == &record.resource_id)
            && self.period.map_or(true, |p| p.contains(record.date))
    }

    /// Matching records, sorted
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a ShiftRecord>) -> Vec<ShiftRecord> {
        collect_sorted(records.into_iter().filter(|r| self.matches(r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shift::{parse_time, ShiftKind};
    use chrono::Utc;

    fn record(seq: u32, resource: &str, date: (i32, u32, u32), start: &str) -> ShiftRecord {
        let now = Utc::now();
        let start_time = parse_time(start).unwrap();
        ShiftRecord {
            id: format!("s-{:07x}", seq).parse().unwrap(),
            resource_id: resource.parse().unwrap(),
            display_name: resource.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start_time,
            end_time: start_time + chrono::Duration::hours(1),
            kind: ShiftKind::StaffDuty,
            subject: None,
            status: ShiftStatus::Approved,
            class_slots: vec![],
            requested_change: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ids(records: &[ShiftRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn period_bounds() {
        let feb = Period::new(2028, 2).unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());

        let dec = Period::new(2026, 12).unwrap();
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());

        assert!(Period::new(2026, 13).is_err());
        assert!(Period::new(2026, 0).is_err());
    }

    #[test]
    fn period_parse_and_display() {
        let p: Period = "2026-10".parse().unwrap();
        assert_eq!(p.to_string(), "2026-10");
        assert!("2026/10".parse::<Period>().is_err());
        assert!("2026-13".parse::<Period>().is_err());
    }

    #[test]
    fn for_period_includes_both_month_edges() {
        let records = vec![
            record(1, "alice", (2026, 9, 30), "09:00"),
            record(2, "alice", (2026, 10, 1), "09:00"),
            record(3, "alice", (2026, 10, 31), "09:00"),
            record(4, "alice", (2026, 11, 1), "09:00"),
        ];
        let found = for_period(&records, &"2026-10".parse().unwrap(), QueryOptions::default());
        assert_eq!(ids(&found), vec!["s-0000002", "s-0000003"]);
    }

    #[test]
    fn deleted_hidden_by_default_purged_always() {
        let mut deleted = record(1, "alice", (2026, 10, 5), "09:00");
        deleted.status = ShiftStatus::Deleted;
        let mut purged = record(2, "alice", (2026, 10, 5), "10:00");
        purged.status = ShiftStatus::Purged;
        let live = record(3, "alice", (2026, 10, 5), "11:00");
        let records = vec![deleted, purged, live];
        let period = "2026-10".parse().unwrap();

        assert_eq!(ids(&for_period(&records, &period, QueryOptions::default())), vec!["s-0000003"]);
        assert_eq!(
            ids(&for_period(&records, &period, QueryOptions::audit())),
            vec!["s-0000001", "s-0000003"]
        );
    }

    #[test]
    fn visibility_by_role() {
        let records = vec![
            record(1, "alice", (2026, 10, 5), "09:00"),
            record(2, "bob", (2026, 10, 5), "09:00"),
        ];

        let alice = Actor::staff("alice".parse().unwrap());
        assert_eq!(ids(&visible_to(&records, &alice, QueryOptions::default())), vec!["s-0000001"]);

        let boss = Actor::privileged("boss".parse().unwrap());
        assert_eq!(visible_to(&records, &boss, QueryOptions::default()).len(), 2);
    }

    #[test]
    fn sort_by_date_then_start_then_id() {
        let records = vec![
            record(5, "alice", (2026, 10, 6), "09:00"),
            record(4, "bob", (2026, 10, 5), "10:00"),
            record(3, "alice", (2026, 10, 5), "10:00"),
            record(9, "alice", (2026, 10, 5), "08:00"),
        ];
        let sorted = ShiftFilter::all().apply(&records);
        assert_eq!(ids(&sorted), vec!["s-0000009", "s-0000003", "s-0000004", "s-0000005"]);
    }

    #[test]
    fn awaiting_approval_picks_pending_and_deletion_requests() {
        let mut pending = record(1, "alice", (2026, 10, 5), "09:00");
        pending.status = ShiftStatus::Pending;
        let mut deleting = record(2, "bob", (2026, 10, 5), "09:00");
        deleting.status = ShiftStatus::DeletionRequested;
        let approved = record(3, "bob", (2026, 10, 5), "11:00");

        let found = awaiting_approval(&[approved, deleting, pending]);
        assert_eq!(ids(&found), vec!["s-0000001", "s-0000002"]);
    }

    #[test]
    fn groups_by_day_and_resource() {
        let records = vec![
            record(1, "alice", (2026, 10, 5), "10:00"),
            record(2, "alice", (2026, 10, 5), "09:00"),
            record(3, "bob", (2026, 10, 5), "09:00"),
            record(4, "alice", (2026, 10, 6), "09:00"),
        ];
        let groups = by_day_and_resource(&records);
        assert_eq!(groups.len(), 3);

        let key: (NaiveDate, ResourceId) =
            (NaiveDate::from_ymd_opt(2026, 10, 5).unwrap(), "alice".parse().unwrap());
        assert_eq!(ids(&groups[&key]), vec!["s-0000002", "s-0000001"]);
    }

    #[test]
    fn filter_combines_resource_and_period() {
        let records = vec![
            record(1, "alice", (2026, 10, 5), "09:00"),
            record(2, "bob", (2026, 10, 5), "09:00"),
            record(3, "alice", (2026, 11, 5), "09:00"),
        ];
        let filter = ShiftFilter::all()
            .for_resource("alice".parse().unwrap())
            .in_period("2026-10".parse().unwrap());
        assert_eq!(ids(&filter.apply(&records)), vec!["s-0000001"]);
    }

    #[test]
    fn counts_skip_empty_statuses() {
        let mut pending = record(1, "alice", (2026, 10, 5), "09:00");
        pending.status = ShiftStatus::Pending;
        let records = vec![pending, record(2, "alice", (2026, 10, 5), "10:00"), record(3, "bob", (2026, 10, 5), "10:00")];

        assert_eq!(
            count_by_status(&records),
            vec![(ShiftStatus::Pending, 1), (ShiftStatus::Approved, 2)]
        );
    }
}
