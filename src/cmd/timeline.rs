//! Timeline commands for `floortrack timeline`.
//!
//! The timeline shows, for each selected job, the station stays that fall
//! inside the saved date range. Selection and range persist between runs.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};

use floortrack::app::App;
use floortrack::common::filter::{JobTag, job_tags, matches_tags, tag_counts};
use floortrack::common::{Job, timestamp};
use floortrack::errors::ApiError;
use floortrack::poll::continue_unless_signed_out;
use floortrack::services::jobs::{jobs_by_id_with_history, list_jobs};
use floortrack::ui::{Table, icons, status_cell, tag_cell};
use floortrack::view::{DateRange, Theme};

use super::super::TimelineCommands;
use super::{SIGN_IN_HINT, listed, parse_when, refreshed_line, theme, watch};

pub async fn cmd_timeline(app: &App, command: TimelineCommands) -> Result<()> {
    match command {
        TimelineCommands::Show { tag } => {
            let selected = app.view.selected_jobs()?;
            let result = jobs_by_id_with_history(&app.api, &selected).await;
            render(app, &selected, result, &tag)?;
        }
        TimelineCommands::Jobs { search, tag } => {
            let search = search.unwrap_or_default().to_lowercase();
            let jobs = listed("jobs", list_jobs(&app.api).await);
            let selected = app.view.selected_jobs()?;
            let now = Utc::now();
            let theme = theme(app);

            println!();
            let counts = tag_counts(&jobs, now)
                .into_iter()
                .map(|(t, n)| format!("{} {}", tag_cell(t, theme), n))
                .collect::<Vec<_>>()
                .join("  ");
            println!("{}", counts);
            println!();

            let mut table = Table::new(["", "ID", "Name", "Status", "Tags"]);
            for job in jobs.iter().filter(|job| {
                (search.is_empty() || job.name.to_lowercase().contains(&search))
                    && matches_tags(job, &tag, now)
            }) {
                table.row([
                    if selected.contains(&job.id) { "*" } else { "" }.to_string(),
                    job.id.to_string(),
                    job.name.clone(),
                    status_cell(job.status, theme),
                    job_tags(job, now)
                        .into_iter()
                        .map(|t| tag_cell(t, theme))
                        .collect::<Vec<_>>()
                        .join(","),
                ]);
            }
            if table.is_empty() {
                println!("No jobs found.");
            } else {
                println!("{}", table.render());
                println!();
                println!("Jobs marked * are on the timeline.");
            }
        }
        TimelineCommands::Select { ids } => {
            app.view.set_selected_jobs(&ids)?;
            if ids.is_empty() {
                println!("Timeline selection cleared.");
            } else {
                println!("{} job(s) selected.", ids.len());
            }
        }
        TimelineCommands::Toggle { id } => {
            if app.view.toggle_selected_job(id)? {
                println!("Job {} added to the timeline.", id);
            } else {
                println!("Job {} removed from the timeline.", id);
            }
        }
        TimelineCommands::Range {
            start,
            end,
            reset,
            preset,
        } => {
            let now = Utc::now();
            let current = app.view.date_range(now)?;
            let range = if let Some(preset) = preset {
                DateRange::preset(preset, now)
            } else if reset {
                DateRange::ending_at(now)
            } else {
                DateRange {
                    start: match start {
                        Some(s) => parse_when(&s, "--start")?,
                        None => current.start,
                    },
                    end: match end {
                        Some(e) => parse_when(&e, "--end")?,
                        None => current.end,
                    },
                }
            };
            if range.start > range.end {
                bail!("Start date must be before end date");
            }
            app.view.set_date_range(&range)?;
            println!(
                "Timeline range: {} to {}",
                timestamp::display(&range.start),
                timestamp::display(&range.end)
            );
        }
        TimelineCommands::Watch { tag } => {
            let secs = app.config.polling().timeline_secs;
            watch(app, secs, || {
                let tag = tag.clone();
                async move {
                    let selected = match app.view.selected_jobs() {
                        Ok(selected) => selected,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to read timeline selection");
                            Vec::new()
                        }
                    };
                    let result = jobs_by_id_with_history(&app.api, &selected).await;
                    let flow = continue_unless_signed_out(&result);
                    if let Err(e) = render(app, &selected, result, &tag) {
                        tracing::error!(error = %e, "Failed to render timeline");
                    }
                    println!();
                    println!("{}", refreshed_line(secs));
                    flow
                }
            })
            .await?;
        }
    }
    Ok(())
}

fn render(
    app: &App,
    selected: &[i64],
    result: Result<Vec<Job>, ApiError>,
    tags: &[JobTag],
) -> Result<()> {
    let now = Utc::now();
    let range = app.view.date_range(now)?;

    println!();
    println!(
        "{}Timeline {} to {}",
        icons::CLOCK,
        timestamp::display(&range.start),
        timestamp::display(&range.end)
    );
    println!();

    if selected.is_empty() {
        println!("No jobs selected.");
        println!();
        println!("Use 'floortrack timeline select <ids>' or 'floortrack timeline jobs' to pick jobs.");
        return Ok(());
    }

    let jobs = match result {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load timeline data");
            if e.requires_sign_in() {
                eprintln!("{}", SIGN_IN_HINT);
            }
            println!("Failed to load timeline data. Please try again later.");
            return Ok(());
        }
    };
    if jobs.is_empty() {
        println!("No timeline data available for selected jobs.");
        return Ok(());
    }

    let theme = theme(app);
    for job in jobs.iter().filter(|job| matches_tags(job, tags, now)) {
        print_job(job, &range, now, theme);
    }
    Ok(())
}

fn print_job(job: &Job, range: &DateRange, now: DateTime<Utc>, theme: Theme) {
    println!(
        "{} {} {}",
        console::style(format!("#{}", job.id)).dim(),
        console::style(&job.name).bold(),
        status_cell(job.status, theme)
    );
    let stays: Vec<_> = job
        .locations
        .iter()
        .filter(|entry| range.overlaps(entry.arrival_time, entry.departure_time, now))
        .collect();
    if stays.is_empty() {
        println!("    No station stays in this range.");
        println!();
        return;
    }

    let mut table = Table::new(["Station", "From", "To", "Hours"]);
    for entry in stays {
        let hours = entry.stay_minutes(now) as f64 / 60.0;
        table.row([
            entry.station_name(),
            timestamp::display(&entry.arrival_time),
            entry
                .departure_time
                .as_ref()
                .map(timestamp::display)
                .unwrap_or_else(|| "Present".to_string()),
            format!("{:.1}", hours),
        ]);
    }
    for line in table.render().lines() {
        println!("    {}", line);
    }
    println!();
}
