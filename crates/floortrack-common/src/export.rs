//! CSV export of jobs and their location history.

use chrono::NaiveDate;

use crate::models::{Job, JobLocation};
use crate::timestamp;

pub const CSV_HEADERS: [&str; 8] = [
    "ID",
    "Name",
    "Description",
    "Status",
    "Customer",
    "Date Created",
    "Due Date",
    "Location History",
];

const HISTORY_SEPARATOR: &str = " → ";

enum Cell<'a> {
    Number(i64),
    Text(&'a str),
}

/// Quote a text cell: internal quotes doubled, whole value wrapped in
/// quotes. Empty text becomes an empty cell.
pub fn escape(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn render(cell: Cell<'_>) -> String {
    match cell {
        Cell::Number(n) => n.to_string(),
        Cell::Text(text) => escape(text),
    }
}

/// `Asset (arrival - departure)` per entry, `Present` for the open one.
pub fn format_location_history(history: &[JobLocation]) -> String {
    history
        .iter()
        .map(|entry| {
            let departure = entry
                .departure_time
                .as_ref()
                .map(timestamp::display)
                .unwrap_or_else(|| "Present".to_string());
            format!(
                "{} ({} - {})",
                entry.station_name(),
                timestamp::display(&entry.arrival_time),
                departure
            )
        })
        .collect::<Vec<_>>()
        .join(HISTORY_SEPARATOR)
}

fn job_row(job: &Job) -> String {
    let created = timestamp::display(&job.date_created);
    let due = job
        .due_date
        .as_ref()
        .map(timestamp::display)
        .unwrap_or_default();
    let history = format_location_history(&job.locations);

    [
        Cell::Number(job.id),
        Cell::Text(&job.name),
        Cell::Text(job.description.as_deref().unwrap_or("")),
        Cell::Text(job.status.as_str()),
        Cell::Text(job.customer_name()),
        Cell::Text(&created),
        Cell::Text(&due),
        Cell::Text(&history),
    ]
    .into_iter()
    .map(render)
    .collect::<Vec<_>>()
    .join(",")
}

/// One header line plus one line per job, joined by `\n`.
pub fn jobs_to_csv(jobs: &[Job]) -> String {
    let mut lines = Vec::with_capacity(jobs.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    lines.extend(jobs.iter().map(job_row));
    lines.join("\n")
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("jobs_export_{}.csv", date.format("%Y-%m-%d"))
}
