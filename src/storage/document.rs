//! Store boundary normalization
//!
//! Documents arrive from the store with every field optional and every value
//! a string. [`ShiftDocument`] captures that loose shape; converting it into a
//! [`ShiftRecord`] either yields a record satisfying every invariant or a
//! [`DocumentError`] naming the first problem. Nothing half-valid gets through.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{
    parse_stored_time, validate_intervals, IntervalError, ResourceId, ShiftDelta, ShiftId, ShiftKind,
    ShiftRecord, ShiftStatus, TimeRange,
};

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("{0}")]
    Interval(#[from] IntervalError),

    #[error("A requested change is not allowed while the shift is {0}")]
    StrayChange(ShiftStatus),
}

/// A shift document as read from the store, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDocument {
    pub id: Option<String>,
    pub resource_id: Option<String>,
    pub display_name: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub class_slots: Option<Vec<SlotDocument>>,
    pub requested_change: Option<DeltaDocument>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDocument {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaDocument {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub kind: Option<String>,
    pub subject: Option<String>,
}

fn required(field: &'static str, value: Option<String>) -> Result<String, DocumentError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(DocumentError::MissingField(field))
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, DocumentError> {
    raw.trim().parse().map_err(|_| DocumentError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

fn time_field(field: &'static str, raw: &str) -> Result<NaiveTime, DocumentError> {
    parse_stored_time(raw).map_err(|_| DocumentError::InvalidField {
        field,
        value: raw.to_string(),
    })
}

fn optional<T>(
    value: Option<String>,
    parse: impl FnOnce(&str) -> Result<T, DocumentError>,
) -> Result<Option<T>, DocumentError> {
    value.as_deref().map(parse).transpose()
}

impl TryFrom<SlotDocument> for TimeRange {
    type Error = DocumentError;

    fn try_from(doc: SlotDocument) -> Result<Self, Self::Error> {
        let start = time_field("classSlots.startTime", &required("classSlots.startTime", doc.start_time)?)?;
        let end = time_field("classSlots.endTime", &required("classSlots.endTime", doc.end_time)?)?;
        Ok(TimeRange::new(start, end)?)
    }
}

impl TryFrom<DeltaDocument> for ShiftDelta {
    type Error = DocumentError;

    fn try_from(doc: DeltaDocument) -> Result<Self, Self::Error> {
        Ok(ShiftDelta {
            date: optional(doc.date, |raw| parse_field::<NaiveDate>("requestedChange.date", raw))?,
            start_time: optional(doc.start_time, |raw| time_field("requestedChange.startTime", raw))?,
            end_time: optional(doc.end_time, |raw| time_field("requestedChange.endTime", raw))?,
            kind: optional(doc.kind, |raw| parse_field::<ShiftKind>("requestedChange.kind", raw))?,
            subject: doc.subject,
        })
    }
}

impl TryFrom<ShiftDocument> for ShiftRecord {
    type Error = DocumentError;

    fn try_from(doc: ShiftDocument) -> Result<Self, Self::Error> {
        let id: ShiftId = parse_field("id", &required("id", doc.id)?)?;
        let resource_id: ResourceId = parse_field("resourceId", &required("resourceId", doc.resource_id)?)?;
        let date: NaiveDate = parse_field("date", &required("date", doc.date)?)?;
        let start_time = time_field("startTime", &required("startTime", doc.start_time)?)?;
        let end_time = time_field("endTime", &required("endTime", doc.end_time)?)?;
        let status: ShiftStatus = parse_field("status", &required("status", doc.status)?)?;
        let created_at: DateTime<Utc> =
            parse_field("createdAt", &required("createdAt", doc.created_at)?)?;

        // Older documents predate these fields
        let kind = optional(doc.kind, |raw| parse_field::<ShiftKind>("kind", raw))?.unwrap_or_default();
        let display_name = doc
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| resource_id.to_string());
        let updated_at =
            optional(doc.updated_at, |raw| parse_field::<DateTime<Utc>>("updatedAt", raw))?.unwrap_or(created_at);

        let mut class_slots = doc
            .class_slots
            .unwrap_or_default()
            .into_iter()
            .map(TimeRange::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        class_slots.sort_by_key(|slot| (slot.start_time, slot.end_time));
        validate_intervals(start_time, end_time, &class_slots)?;

        let requested_change = doc
            .requested_change
            .map(ShiftDelta::try_from)
            .transpose()?
            .filter(|delta| !delta.is_empty());
        if requested_change.is_some() && !status.allows_requested_change() {
            return Err(DocumentError::StrayChange(status));
        }

        let mut record = ShiftRecord {
            id,
            resource_id,
            display_name,
            date,
            start_time,
            end_time,
            kind,
            subject: doc.subject.filter(|s| !s.trim().is_empty()),
            status,
            class_slots,
            requested_change,
            created_at,
            updated_at,
        };
        record.normalize_subject();
        Ok(record)
    }
}

/// Parses one stored line into a validated record
pub fn parse_record(line: &str) -> Result<ShiftRecord, String> {
    let doc: ShiftDocument = serde_json::from_str(line).map_err(|e| format!("Malformed JSON: {}", e))?;
    ShiftRecord::try_from(doc).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_time;
    use serde_json::json;

    fn valid() -> serde_json::Value {
        json!({
            "id": "s-7f2b4c1",
            "resourceId": "alice",
            "displayName": "Alice",
            "date": "2026-10-20",
            "startTime": "09:00",
            "endTime": "12:00",
            "kind": "class_session",
            "subject": "Math",
            "status": "approved",
            "classSlots": [
                { "startTime": "10:00", "endTime": "10:45" },
                { "startTime": "09:00", "endTime": "09:45" }
            ],
            "requestedChange": null,
            "createdAt": "2026-10-01T08:00:00Z",
            "updatedAt": "2026-10-02T08:00:00Z"
        })
    }

    fn convert(value: serde_json::Value) -> Result<ShiftRecord, DocumentError> {
        let doc: ShiftDocument = serde_json::from_value(value).unwrap();
        ShiftRecord::try_from(doc)
    }

    #[test]
    fn valid_document_converts() {
        let record = convert(valid()).unwrap();
        assert_eq!(record.id.to_string(), "s-7f2b4c1");
        assert_eq!(record.kind, ShiftKind::ClassSession);
        assert_eq!(record.subject.as_deref(), Some("Math"));
        assert_eq!(record.class_slots.len(), 2);
        assert_eq!(record.class_slots[0].to_string(), "09:00-09:45");
        assert!(record.requested_change.is_none());
    }

    #[test]
    fn serialized_record_reads_back() {
        let record = convert(valid()).unwrap();
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(parse_record(&line).unwrap(), record);
    }

    #[test]
    fn sub_minute_times_survive_a_rewrite() {
        let mut record = convert(valid()).unwrap();
        record.start_time = NaiveTime::from_hms_opt(9, 0, 10).unwrap();
        record.end_time = NaiveTime::from_hms_opt(9, 0, 50).unwrap();
        record.class_slots.clear();
        record.kind = ShiftKind::StaffDuty;
        record.subject = None;

        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains(r#""startTime":"09:00:10""#));
        assert_eq!(parse_record(&line).unwrap(), record);
    }

    #[test]
    fn legacy_document_gets_defaults() {
        let mut doc = valid();
        let obj = doc.as_object_mut().unwrap();
        obj.remove("kind");
        obj.remove("displayName");
        obj.remove("updatedAt");
        obj.remove("classSlots");

        let record = convert(doc).unwrap();
        assert_eq!(record.kind, ShiftKind::StaffDuty);
        assert_eq!(record.display_name, "alice");
        assert_eq!(record.updated_at, record.created_at);
        assert!(record.subject.is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut doc = valid();
        doc.as_object_mut().unwrap().remove("endTime");
        assert_eq!(convert(doc).unwrap_err(), DocumentError::MissingField("endTime"));
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut doc = valid();
        doc["status"] = json!("archived");
        assert!(matches!(
            convert(doc).unwrap_err(),
            DocumentError::InvalidField { field: "status", .. }
        ));

        let mut doc = valid();
        doc["startTime"] = json!("9am");
        assert!(matches!(
            convert(doc).unwrap_err(),
            DocumentError::InvalidField { field: "startTime", .. }
        ));
    }

    #[test]
    fn interval_violations_are_rejected() {
        let mut doc = valid();
        doc["endTime"] = json!("09:00");
        assert!(matches!(convert(doc).unwrap_err(), DocumentError::Interval(_)));

        let mut doc = valid();
        doc["classSlots"] = json!([{ "startTime": "11:30", "endTime": "12:30" }]);
        assert!(matches!(
            convert(doc).unwrap_err(),
            DocumentError::Interval(IntervalError::SlotOutsideShift { .. })
        ));
    }

    #[test]
    fn requested_change_outside_subworkflow_is_rejected() {
        let mut doc = valid();
        doc["requestedChange"] = json!({ "endTime": "13:00" });
        assert_eq!(
            convert(doc).unwrap_err(),
            DocumentError::StrayChange(ShiftStatus::Approved)
        );

        let mut doc = valid();
        doc["status"] = json!("pending");
        doc["requestedChange"] = json!({ "endTime": "13:00" });
        let record = convert(doc).unwrap();
        assert_eq!(
            record.requested_change.unwrap().end_time,
            Some(parse_time("13:00").unwrap())
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(parse_record("{not json").unwrap_err().starts_with("Malformed JSON"));
        assert!(parse_record(r#"{"id": 42}"#).is_err());
    }
}
