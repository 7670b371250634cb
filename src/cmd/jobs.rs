//! Job commands for `floortrack jobs`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use floortrack::app::App;
use floortrack::common::export::{export_filename, jobs_to_csv};
use floortrack::common::filter::JobQuery;
use floortrack::common::{Job, JobLocation, NewJob, timestamp};
use floortrack::poll::continue_unless_signed_out;
use floortrack::services::jobs::{
    complete_job, create_job, get_job, job_history, jobs_with_history, list_jobs, move_job,
    update_job_status,
};
use floortrack::ui::{Table, icons, status_cell};
use floortrack::view::Theme;

use super::super::{JobFilterArgs, JobsCommands};
use super::{listed, optional, parse_when, refreshed_line, theme, watch};

impl JobFilterArgs {
    fn query(&self) -> JobQuery {
        JobQuery {
            search: self.search.clone().unwrap_or_default(),
            status: self.status,
        }
    }
}

pub async fn cmd_jobs(app: &App, command: JobsCommands) -> Result<()> {
    match command {
        JobsCommands::List { filter } => {
            let jobs = listed("jobs", list_jobs(&app.api).await);
            print_jobs(&jobs, &filter.query(), theme(app), Utc::now());
        }
        JobsCommands::Show { id } => {
            let (job, history) =
                futures::try_join!(get_job(&app.api, id), job_history(&app.api, id))?;
            let theme = theme(app);
            println!();
            println!("{}{}", icons::JOB, console::style(&job.name).bold());
            println!("  ID:          {}", job.id);
            println!("  Status:      {}", status_cell(job.status, theme));
            println!("  Customer:    {}", optional(Some(job.customer_name())));
            println!("  Description: {}", optional(job.description.as_deref()));
            println!("  Created:     {}", timestamp::display(&job.date_created));
            println!("  Due:         {}", due_cell(&job, Utc::now()));
            println!();
            print_history(&history);
        }
        JobsCommands::Create {
            name,
            customer,
            description,
            due,
        } => {
            let due_date = due.as_deref().map(|d| parse_when(d, "--due")).transpose()?;
            let job = create_job(
                &app.api,
                &NewJob {
                    name,
                    description,
                    customer_id: customer,
                    due_date,
                },
            )
            .await?;
            println!("{}Created job {} ({})", icons::CHECK, job.id, job.name);
        }
        JobsCommands::Move { id, station } => {
            let job = move_job(&app.api, id, station).await?;
            println!(
                "{}Moved {} to station {}",
                icons::MOVE,
                console::style(&job.name).bold(),
                station
            );
        }
        JobsCommands::Status { id, status } => {
            let job = update_job_status(&app.api, id, status).await?;
            println!(
                "{}{} is now {}",
                icons::CHECK,
                job.name,
                status_cell(job.status, theme(app))
            );
        }
        JobsCommands::Complete { id } => {
            let job = complete_job(&app.api, id).await?;
            println!("{}{} marked complete", icons::CHECK, job.name);
        }
        JobsCommands::History { id } => {
            let history = job_history(&app.api, id).await?;
            print_history(&history);
        }
        JobsCommands::Export { filter, output } => {
            export(app, &filter.query(), output).await?;
        }
        JobsCommands::Watch { filter } => {
            let secs = app.config.polling().jobs_secs;
            let query = filter.query();
            watch(app, secs, || {
                let query = query.clone();
                async move {
                    let result = list_jobs(&app.api).await;
                    let flow = continue_unless_signed_out(&result);
                    let jobs = listed("jobs", result);
                    print_jobs(&jobs, &query, theme(app), Utc::now());
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

fn due_cell(job: &Job, now: DateTime<Utc>) -> String {
    match &job.due_date {
        Some(due) if job.is_overdue(now) => console::style(format!(
            "{} (overdue)",
            timestamp::display(due)
        ))
        .red()
        .to_string(),
        Some(due) => timestamp::display(due),
        None => "-".to_string(),
    }
}

pub(crate) fn jobs_table(jobs: &[&Job], theme: Theme, now: DateTime<Utc>) -> Table {
    let mut table = Table::new(["ID", "Name", "Customer", "Status", "Station", "Due"]);
    for job in jobs {
        let station = job
            .current_location
            .as_ref()
            .map(JobLocation::station_name)
            .unwrap_or_else(|| "-".to_string());
        table.row([
            job.id.to_string(),
            job.name.clone(),
            optional(Some(job.customer_name())).to_string(),
            status_cell(job.status, theme),
            station,
            due_cell(job, now),
        ]);
    }
    table
}

fn print_jobs(jobs: &[Job], query: &JobQuery, theme: Theme, now: DateTime<Utc>) {
    let matching = query.apply(jobs, now);
    println!();
    println!(
        "{}Jobs ({} of {})",
        icons::JOB,
        matching.len(),
        jobs.len()
    );
    println!();
    if matching.is_empty() {
        println!("No jobs found.");
    } else {
        println!("{}", jobs_table(&matching, theme, now).render());
    }
}

pub(crate) fn print_history(history: &[JobLocation]) {
    if history.is_empty() {
        println!("No location history.");
        return;
    }
    let mut table = Table::new(["Station", "Arrived", "Departed", "Duration"]);
    let now = Utc::now();
    for entry in history {
        let departed = entry
            .departure_time
            .as_ref()
            .map(timestamp::display)
            .unwrap_or_else(|| "Present".to_string());
        let minutes = entry.stay_minutes(now);
        table.row([
            entry.station_name(),
            timestamp::display(&entry.arrival_time),
            departed,
            format!("{}h {:02}m", minutes / 60, minutes % 60),
        ]);
    }
    println!("{}", table.render());
}

async fn export(app: &App, query: &JobQuery, output: Option<PathBuf>) -> Result<()> {
    let now = Utc::now();
    let jobs = jobs_with_history(&app.api).await?;
    let selected: Vec<Job> = query.apply(&jobs, now).into_iter().cloned().collect();

    let path = output.unwrap_or_else(|| PathBuf::from(export_filename(now.date_naive())));
    std::fs::write(&path, jobs_to_csv(&selected))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(jobs = selected.len(), path = %path.display(), "Jobs exported");
    println!(
        "{}Exported {} job(s) to {}",
        icons::EXPORT,
        selected.len(),
        path.display()
    );
    Ok(())
}
