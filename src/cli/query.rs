//! Query commands (pending, status)
//!
//! `status --month` also lists the configured holidays of that month.

use anyhow::Result;
use chrono::NaiveDate;

use super::app::{ActorArgs, Session};
use super::output::Output;
use super::shift::print_records;
use crate::domain::query::{self, QueryOptions};
use crate::domain::{Period, ShiftFilter};
use crate::storage::ShiftRepository;

/// Show shifts awaiting a privileged decision
pub fn pending(actor: &ActorArgs, output: &Output) -> Result<()> {
    let session = Session::open(actor, output)?;

    let records = session.store().fetch_shifts(&ShiftFilter::all())?;
    let visible = query::visible_to(&records, &session.actor, QueryOptions::default());
    let waiting = query::awaiting_approval(&visible);
    output.verbose_ctx("pending", &format!("Found {} shifts awaiting approval", waiting.len()));

    if !output.is_json() && !waiting.is_empty() {
        println!("Awaiting approval ({}):", waiting.len());
    }
    print_records(output, &waiting, "Nothing awaiting approval.");
    Ok(())
}

/// Show shift counts per status
pub fn status(actor: &ActorArgs, output: &Output, month: Option<Period>) -> Result<()> {
    let session = Session::open(actor, output)?;
    let loaded = session.store().load()?;

    let all: Vec<_> = loaded.records.into_values().collect();
    let mut scoped = query::visible_to(&all, &session.actor, QueryOptions::audit());
    if let Some(period) = month {
        scoped = query::for_period(&scoped, &period, QueryOptions::audit());
    }
    let counts = query::count_by_status(&scoped);
    let waiting = query::awaiting_approval(&scoped).len();

    let calendar = session.project.config().project.holiday_calendar()?;
    let holidays: Vec<(NaiveDate, String)> = match month {
        Some(period) => calendar
            .between(period.first_day(), period.last_day())
            .map(|(date, label)| (*date, label.clone()))
            .collect(),
        None => Vec::new(),
    };

    if output.is_json() {
        if !loaded.quarantined.is_empty() {
            output.warn(&format!(
                "{} invalid line(s) in {} are being skipped",
                loaded.quarantined.len(),
                session.store().path().display()
            ));
        }
        let by_status: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(status, count)| (status.as_str().to_string(), (*count).into()))
            .collect();
        output.data(&serde_json::json!({
            "period": month.map(|p| p.to_string()),
            "total": scoped.len(),
            "awaiting_approval": waiting,
            "by_status": by_status,
            "holidays": holidays
                .iter()
                .map(|(date, label)| serde_json::json!({ "date": date, "label": label }))
                .collect::<Vec<_>>(),
            "quarantined": loaded.quarantined.len(),
        }));
        return Ok(());
    }

    match month {
        Some(period) => println!("Shifts in {}: {}", period, scoped.len()),
        None => println!("Shifts: {}", scoped.len()),
    }
    for (status, count) in &counts {
        println!("  {:<20} {}", status.as_str(), count);
    }
    println!();
    println!("Awaiting approval: {}", waiting);

    if !holidays.is_empty() {
        println!();
        println!("Holidays:");
        for (date, label) in &holidays {
            println!("  {} {}", date, label);
        }
    }

    if !loaded.quarantined.is_empty() {
        println!();
        println!(
            "Warning: {} invalid line(s) in {} are being skipped",
            loaded.quarantined.len(),
            session.store().path().display()
        );
        for entry in &loaded.quarantined {
            println!("  line {}: {}", entry.line, entry.reason);
        }
    }

    Ok(())
}
