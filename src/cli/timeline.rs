//! Timeline command
//!
//! Text mode draws one row per lane, one character per grid step:
//! `#` for a shift, `=` where a class slot sits on top of it.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Timelike};

use super::app::{ActorArgs, Session};
use super::output::Output;
use crate::domain::layout::{layout_board, layout_day};
use crate::domain::query::{self, QueryOptions};
use crate::domain::{DayLayout, LayoutWindow, ResourceId, ShiftFilter, ShiftRecord};
use crate::storage::ShiftRepository;

pub fn show(
    actor: &ActorArgs,
    output: &Output,
    date: NaiveDate,
    resource: Option<&ResourceId>,
) -> Result<()> {
    let session = Session::open(actor, output)?;
    let config = &session.project.config().project;
    let window = config.timeline.window()?;
    let holidays = config.holiday_calendar()?;

    let records = session.store().fetch_shifts(&ShiftFilter::all())?;
    let visible = query::visible_to(&records, &session.actor, QueryOptions::default());

    let layouts = match resource {
        Some(resource) => vec![layout_day(date, resource, &visible, &window, &holidays)],
        None => layout_board(&visible, date, &window, &holidays),
    };
    output.verbose_ctx("timeline", &format!("{} resource row(s)", layouts.len()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "date": date,
            "holiday": holidays.label(date),
            "window": window,
            "resources": layouts,
        }));
        return Ok(());
    }

    match holidays.label(date) {
        Some(label) => println!("{} (holiday: {})", date, label),
        None => println!("{}", date),
    }

    if layouts.is_empty() {
        println!("No shifts.");
        return Ok(());
    }

    let cells = window.step_count().ceil() as usize;
    println!(
        "{:<14} {} {}-{}",
        "",
        ruler(&window, cells),
        window.start().format("%H:%M"),
        window.end().format("%H:%M")
    );

    for layout in &layouts {
        print_layout(layout, &visible, cells);
    }

    Ok(())
}

fn print_layout(layout: &DayLayout, records: &[ShiftRecord], cells: usize) {
    for lane in 0..layout.lane_count.max(1) {
        let shifts: Vec<(f64, f64)> = layout
            .placements
            .iter()
            .filter(|p| p.lane == lane)
            .map(|p| (p.start_offset, p.end_offset))
            .collect();
        let slots: Vec<(f64, f64)> = layout
            .slots
            .iter()
            .filter(|s| s.lane == lane)
            .map(|s| (s.start_offset, s.end_offset))
            .collect();

        let label = if lane == 0 {
            layout.resource_id.to_string()
        } else {
            String::new()
        };
        println!("{:<14} {}", label, grid_row(&shifts, &slots, cells));
    }

    for placement in &layout.placements {
        let Some(record) = records.iter().find(|r| r.id == placement.shift_id) else {
            continue;
        };
        let mut line = format!(
            "  {} {} {} [{}]",
            record.id,
            record.interval(),
            record.display_name,
            record.status
        );
        if let Some(subject) = &record.subject {
            line.push_str(&format!(" {}", subject));
        }
        if placement.clipped {
            line.push_str(" (extends past window)");
        }
        println!("{}", line);
    }
}

/// `|` at every full hour, `.` elsewhere
fn ruler(window: &LayoutWindow, cells: usize) -> String {
    let step = Duration::minutes(i64::from(window.step_minutes()));
    (0..cells)
        .map(|i| {
            let time = window.start() + step * i as i32;
            if time.minute() == 0 {
                '|'
            } else {
                '.'
            }
        })
        .collect()
}

/// Renders one lane: cell `i` covers steps `[i, i + 1)`
fn grid_row(shifts: &[(f64, f64)], slots: &[(f64, f64)], cells: usize) -> String {
    let covers = |spans: &[(f64, f64)], i: usize| {
        let (lo, hi) = (i as f64, (i + 1) as f64);
        spans.iter().any(|(start, end)| *start < hi && *end > lo)
    };

    (0..cells)
        .map(|i| {
            if covers(slots, i) {
                '='
            } else if covers(shifts, i) {
                '#'
            } else {
                ' '
            }
        })
        .collect()
}
