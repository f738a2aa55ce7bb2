//! Shift CLI commands

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Subcommand;

use super::app::{with_kind, ActorArgs, Session};
use super::output::Output;
use crate::domain::lifecycle::Action;
use crate::domain::query::{self, QueryOptions};
use crate::domain::{
    parse_time, NewShift, ParseError, Period, ResourceId, ShiftDelta, ShiftFilter, ShiftId,
    ShiftKind, ShiftRecord, TimeRange,
};
use crate::storage::{ShiftRepository, StoreError};

#[derive(Subcommand)]
pub enum ShiftCommands {
    /// Create a shift for yourself (or, when privileged, for --resource)
    ///
    /// Examples:
    ///   shifts shift add --date 2026-10-20 --start 09:00 --end 12:00
    ///   shifts shift add --date 2026-10-20 --start 13:00 --end 16:00 \
    ///       --kind class-session --subject Math --slot 13:00-13:45 --submit
    Add {
        /// Day of the shift (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,

        /// End time (HH:MM), exclusive
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,

        /// staff-duty or class-session
        #[arg(long, default_value = "staff-duty")]
        kind: ShiftKind,

        /// Lesson subject (class sessions only)
        #[arg(long)]
        subject: Option<String>,

        /// Class slot within the shift (HH:MM-HH:MM), repeatable
        #[arg(long = "slot")]
        slots: Vec<TimeRange>,

        /// Owner of the shift (defaults to the actor)
        #[arg(long)]
        resource: Option<ResourceId>,

        /// Name shown on the timeline (defaults to the owner ID)
        #[arg(long)]
        name: Option<String>,

        /// Submit for approval right away
        #[arg(long)]
        submit: bool,
    },

    /// List shifts visible to you
    List {
        /// Only this month (YYYY-MM)
        #[arg(long)]
        month: Option<Period>,

        /// Also list deleted shifts
        #[arg(long)]
        include_deleted: bool,
    },

    /// Show shift details
    Show {
        /// Shift ID
        id: ShiftId,
    },

    /// Submit a draft for approval
    Submit { id: ShiftId },

    /// Approve a pending shift or deletion request (privileged)
    Approve { id: ShiftId },

    /// Reject a pending shift or change request (privileged)
    Reject { id: ShiftId },

    /// Ask for an approved shift to be deleted
    RequestDeletion { id: ShiftId },

    /// Withdraw a deletion request
    CancelDeletion { id: ShiftId },

    /// Mark an approved shift as completed (privileged)
    Complete { id: ShiftId },

    /// Permanently remove a deleted shift (privileged)
    Purge { id: ShiftId },

    /// Propose a change to an approved shift
    ///
    /// The shift becomes a draft carrying the change; submit it for approval.
    Propose {
        /// Shift ID
        id: ShiftId,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, value_parser = parse_time)]
        start: Option<NaiveTime>,

        #[arg(long, value_parser = parse_time)]
        end: Option<NaiveTime>,

        #[arg(long)]
        kind: Option<ShiftKind>,

        #[arg(long)]
        subject: Option<String>,
    },
}

pub fn run(cmd: ShiftCommands, actor: &ActorArgs, output: &Output) -> Result<()> {
    let session = Session::open(actor, output)?;

    match cmd {
        ShiftCommands::Add {
            date,
            start,
            end,
            kind,
            subject,
            slots,
            resource,
            name,
            submit,
        } => {
            let resource_id = resource.unwrap_or_else(|| session.actor.id.clone());
            let new = NewShift {
                display_name: name.unwrap_or_else(|| resource_id.to_string()),
                resource_id,
                date,
                start_time: start,
                end_time: end,
                kind,
                subject,
                class_slots: slots,
            };
            add_shift(&session, output, new, submit)
        }
        ShiftCommands::List {
            month,
            include_deleted,
        } => list_shifts(&session, output, month, include_deleted),
        ShiftCommands::Show { id } => show_shift(&session, output, &id),
        ShiftCommands::Submit { id } => apply(&session, output, &id, Action::Submit),
        ShiftCommands::Approve { id } => apply(&session, output, &id, Action::Approve),
        ShiftCommands::Reject { id } => apply(&session, output, &id, Action::Reject),
        ShiftCommands::RequestDeletion { id } => {
            apply(&session, output, &id, Action::RequestDeletion)
        }
        ShiftCommands::CancelDeletion { id } => {
            apply(&session, output, &id, Action::CancelDeletion)
        }
        ShiftCommands::Complete { id } => apply(&session, output, &id, Action::Complete),
        ShiftCommands::Purge { id } => apply(&session, output, &id, Action::Purge),
        ShiftCommands::Propose {
            id,
            date,
            start,
            end,
            kind,
            subject,
        } => {
            let delta = ShiftDelta {
                date,
                start_time: start,
                end_time: end,
                kind,
                subject,
            };
            propose(&session, output, &id, delta)
        }
    }
}

/// Parses `YYYY-MM-DDTHH:MM` (or with a space instead of `T`)
pub fn parse_instant(s: &str) -> Result<NaiveDateTime, ParseError> {
    let s = s.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .ok_or_else(|| ParseError::Unknown {
            kind: "instant",
            value: s.to_string(),
        })
}

fn add_shift(session: &Session, output: &Output, new: NewShift, submit: bool) -> Result<()> {
    output.verbose_ctx(
        "add",
        &format!("Creating shift for {} on {}", new.resource_id, new.date),
    );
    let record = session.workflow(|w| w.create(new, &session.actor, submit))?;

    if output.is_json() {
        output.data(&record);
    } else {
        output.success(&format!(
            "Created shift: {} ({} {}, {})",
            record.id,
            record.date,
            record.interval(),
            record.status
        ));
    }
    Ok(())
}

fn list_shifts(
    session: &Session,
    output: &Output,
    month: Option<Period>,
    include_deleted: bool,
) -> Result<()> {
    let mut filter = ShiftFilter::all();
    if let Some(period) = month {
        filter = filter.in_period(period);
    }
    if include_deleted {
        filter = filter.including_deleted();
    }

    let records = session.store().fetch_shifts(&filter)?;
    let visible = query::visible_to(&records, &session.actor, filter.options);
    output.verbose_ctx("list", &format!("{} of {} shifts visible", visible.len(), records.len()));

    print_records(output, &visible, "No shifts found.");
    Ok(())
}

fn show_shift(session: &Session, output: &Output, id: &ShiftId) -> Result<()> {
    // Shifts hidden from the actor are reported exactly like missing ones
    let record = session
        .store()
        .fetch_shift(id)
        .and_then(|record| {
            let visible = query::visible_to(
                std::slice::from_ref(&record),
                &session.actor,
                QueryOptions::audit(),
            );
            if visible.is_empty() {
                Err(StoreError::NotFound(id.clone()))
            } else {
                Ok(record)
            }
        })
        .map_err(|e| with_kind(e.into()))?;

    if output.is_json() {
        output.data(&record);
        return Ok(());
    }

    println!("Shift: {}", record.id);
    println!("Resource: {} ({})", record.resource_id, record.display_name);
    println!("Date: {}", record.date);
    println!("Time: {}", record.interval());
    println!("Kind: {}", record.kind.as_str());
    if let Some(subject) = &record.subject {
        println!("Subject: {}", subject);
    }
    println!("Status: {}", record.status);
    if !record.class_slots.is_empty() {
        let slots: Vec<String> = record.class_slots.iter().map(ToString::to_string).collect();
        println!("Slots: {}", slots.join(", "));
    }
    if let Some(change) = &record.requested_change {
        println!();
        println!("Requested change:");
        if let Some(date) = change.date {
            println!("  date: {} -> {}", record.date, date);
        }
        if let Some(start) = change.start_time {
            println!("  start: {} -> {}", record.start_time.format("%H:%M"), start.format("%H:%M"));
        }
        if let Some(end) = change.end_time {
            println!("  end: {} -> {}", record.end_time.format("%H:%M"), end.format("%H:%M"));
        }
        if let Some(kind) = change.kind {
            println!("  kind: {} -> {}", record.kind.as_str(), kind.as_str());
        }
        if let Some(subject) = &change.subject {
            println!("  subject: {}", subject);
        }
    }
    println!();
    println!("Created: {}", record.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M"));

    Ok(())
}

fn apply(session: &Session, output: &Output, id: &ShiftId, action: Action) -> Result<()> {
    output.verbose_ctx(action.as_str(), &format!("Applying to {}", id));
    let record = session.workflow(|w| w.apply(id, action, &session.actor))?;

    if output.is_json() {
        output.data(&record);
    } else {
        output.success(&format!("{}: {} -> {}", record.id, action.as_str(), record.status));
    }
    Ok(())
}

fn propose(session: &Session, output: &Output, id: &ShiftId, delta: ShiftDelta) -> Result<()> {
    let record = session.workflow(|w| w.propose(id, delta, &session.actor))?;

    if output.is_json() {
        output.data(&record);
    } else {
        output.success(&format!(
            "Proposed change to {}; submit it for approval with 'shifts shift submit {}'",
            record.id, record.id
        ));
    }
    Ok(())
}

/// System sweep over elapsed approved shifts
pub fn complete_elapsed(
    actor: &ActorArgs,
    output: &Output,
    at: Option<NaiveDateTime>,
) -> Result<()> {
    let session = Session::open(actor, output)?;
    let now = at.unwrap_or_else(|| Local::now().naive_local());
    output.verbose_ctx("complete-elapsed", &format!("Completing shifts ended by {}", now));

    let completed = session.workflow(|w| w.complete_elapsed(&session.actor, now))?;

    if output.is_json() {
        output.data(&completed);
    } else {
        output.success(&format!("Completed {} shift(s)", completed.len()));
        for record in &completed {
            println!("  {} {} {}", record.id, record.date, record.interval());
        }
    }
    Ok(())
}

/// Prints records as a table, or as a JSON array
pub(crate) fn print_records(output: &Output, records: &[ShiftRecord], empty: &str) {
    if output.is_json() {
        output.data(&records);
        return;
    }

    if records.is_empty() {
        println!("{}", empty);
        return;
    }

    println!(
        "{:<10} {:<11} {:<12} {:<12} {:<18} NAME",
        "ID", "DATE", "TIME", "RESOURCE", "STATUS"
    );
    println!("{}", "-".repeat(80));
    for record in records {
        let status = if record.has_requested_change() {
            format!("{}*", record.status)
        } else {
            record.status.to_string()
        };
        println!(
            "{:<10} {:<11} {:<12} {:<12} {:<18} {}",
            record.id.to_string(),
            record.date.to_string(),
            record.interval().to_string(),
            record.resource_id.as_str(),
            status,
            record.display_name
        );
    }
    println!();
    println!("{} shift(s); * = change requested", records.len());
}
