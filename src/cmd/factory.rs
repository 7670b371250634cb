//! Factory floor commands for `floortrack factory`.

use std::sync::Mutex;

use anyhow::{Result, bail};
use chrono::Utc;

use floortrack::app::App;
use floortrack::common::filter::matches_tags;
use floortrack::common::routing::{PathKind, RoutedPath, StationPositions, route_step};
use floortrack::common::{Job, JobLocation, Position};
use floortrack::poll::continue_unless_signed_out;
use floortrack::services::jobs::{get_job, job_history};
use floortrack::services::stations::{list_stations, stations_with_jobs, update_station_position};
use floortrack::ui::{Table, icons, status_cell};
use floortrack::view::{DEFAULT_POSITION, ViewConfig};

use super::super::FactoryCommands;
use super::{listed, refreshed_line, theme, watch};

pub async fn cmd_factory(app: &App, command: FactoryCommands) -> Result<()> {
    match command {
        FactoryCommands::Show { tag } => {
            let result = stations_with_jobs(&app.api).await;
            if let Ok(stations) = &result
                && !stations.is_empty()
            {
                let ids: Vec<i64> = stations.iter().map(|s| s.id).collect();
                app.view.prune_station_positions(&ids)?;
            }
            let stations = listed("stations", result);
            let positions = app.view.station_positions()?;
            let now = Utc::now();

            println!();
            println!("{}Factory floor", icons::STATION);
            print_view_config(&app.view.view_config()?);
            println!();
            if stations.is_empty() {
                println!("No stations found.");
                return Ok(());
            }

            let mut table = Table::new(["ID", "Station", "X", "Y", "Jobs"]);
            for station in &stations {
                let (pos, placed) = match positions.get(&station.id) {
                    Some(pos) => (*pos, true),
                    None => (DEFAULT_POSITION, false),
                };
                let jobs: Vec<String> = station
                    .current_jobs
                    .iter()
                    .filter(|job| matches_tags(job, &tag, now))
                    .map(|job| format!("{} ({})", job.name, job.status.label()))
                    .collect();
                table.row([
                    station.id.to_string(),
                    station.name.clone(),
                    format!("{:.0}{}", pos.x, if placed { "" } else { "*" }),
                    format!("{:.0}", pos.y),
                    if jobs.is_empty() {
                        "-".to_string()
                    } else {
                        jobs.join(", ")
                    },
                ]);
            }
            println!("{}", table.render());
            if stations.iter().any(|s| !positions.contains_key(&s.id)) {
                println!();
                println!("* not placed yet; run 'floortrack factory layout' or 'move-station'.");
            }
        }
        FactoryCommands::Route { job, step } => {
            let (job, history) =
                futures::try_join!(get_job(&app.api, job), job_history(&app.api, job))?;
            let positions = app.view.station_positions()?;
            print_route(&job, &history, &positions, step, theme(app))?;
        }
        FactoryCommands::Live { job: job_id } => {
            let secs = app.config.polling().factory_secs;
            let last_station: Mutex<Option<i64>> = Mutex::new(None);
            let last_station = &last_station;
            watch(app, secs, move || async move {
                let result = futures::try_join!(
                    get_job(&app.api, job_id),
                    job_history(&app.api, job_id)
                );
                let flow = continue_unless_signed_out(&result);
                match result {
                    Ok((job, history)) => {
                        let current = job_current_station(&history);
                        if let Ok(mut last) = last_station.lock() {
                            if last.is_some() && *last != current {
                                tracing::info!(
                                    job_id,
                                    station_id = ?current,
                                    "Job moved while watching"
                                );
                            }
                            *last = current;
                        }
                        let positions = app.view.station_positions().unwrap_or_default();
                        let last_step = history.len().saturating_sub(2);
                        if let Err(e) =
                            print_route(&job, &history, &positions, Some(last_step), theme(app))
                        {
                            tracing::error!(error = %e, "Failed to render route");
                        }
                    }
                    Err(e) => {
                        tracing::error!(job_id, error = %e, "Failed to refresh job history");
                        println!("No data for job {}.", job_id);
                    }
                }
                println!();
                println!("{}", refreshed_line(secs));
                flow
            })
            .await?;
        }
        FactoryCommands::MoveStation {
            station,
            x,
            y,
            sync,
        } => {
            let position = Position::new(x, y);
            app.view.set_station_position(station, position)?;
            if sync {
                update_station_position(&app.api, station, position).await?;
            }
            println!(
                "Station {} placed at ({:.0}, {:.0}){}",
                station,
                x,
                y,
                if sync { " and saved on the backend" } else { "" }
            );
        }
        FactoryCommands::Layout { stations } => {
            let ids = if stations.is_empty() {
                list_stations(&app.api)
                    .await?
                    .into_iter()
                    .map(|s| s.id)
                    .collect()
            } else {
                stations
            };
            let positions = app.view.apply_default_layout(&ids)?;
            println!("Arranged {} station(s) in the default grid.", positions.len());
            for (id, pos) in &positions {
                println!("  {:>5}  ({:.0}, {:.0})", id, pos.x, pos.y);
            }
            println!("Zoom reset to 1.0.");
        }
        FactoryCommands::Zoom { level } => {
            let config = match level.as_str() {
                "in" => app.view.zoom_by(1)?,
                "out" => app.view.zoom_by(-1)?,
                "reset" => app.view.zoom_to(1.0)?,
                other => match other.parse::<f64>() {
                    Ok(scale) => app.view.zoom_to(scale)?,
                    Err(_) => bail!(
                        "Invalid zoom '{}': expected in, out, reset or a number",
                        other
                    ),
                },
            };
            print_view_config(&config);
        }
        FactoryCommands::Pan { x, y } => {
            let config = app.view.pan_to(Position::new(x, y))?;
            print_view_config(&config);
        }
    }
    Ok(())
}

fn job_current_station(history: &[JobLocation]) -> Option<i64> {
    floortrack::common::current_location(history).map(|entry| entry.asset_id)
}

fn print_view_config(config: &ViewConfig) {
    println!(
        "Zoom {:.0}% · pan ({:.0}, {:.0})",
        config.scale * 100.0,
        config.pan.x,
        config.pan.y
    );
}

fn kind_label(kind: PathKind) -> &'static str {
    match kind {
        PathKind::Arrival => "arrival",
        PathKind::Transit => "transit",
        PathKind::Completion => "completion",
    }
}

fn print_route(
    job: &Job,
    history: &[JobLocation],
    positions: &StationPositions,
    step: Option<usize>,
    theme: floortrack::view::Theme,
) -> Result<()> {
    println!();
    println!(
        "{}{} {}",
        icons::JOB,
        console::style(&job.name).bold(),
        status_cell(job.status, theme)
    );
    if history.is_empty() {
        println!("No location history.");
        return Ok(());
    }

    // One step per hop; a single stay still has its arrival step.
    let steps = history.len().saturating_sub(1).max(1);
    let range = match step {
        Some(s) if s >= steps => bail!("Step {} out of range: job has {} step(s)", s, steps),
        Some(s) => s..s + 1,
        None => 0..steps,
    };

    for s in range {
        let from = history[s].station_name();
        let title = match history.get(s + 1) {
            Some(next) => format!("Step {} of {}: {} → {}", s + 1, steps, from, next.station_name()),
            None => format!("Step {} of {}: {}", s + 1, steps, from),
        };
        println!();
        println!("{}", console::style(title).cyan());
        let paths = route_step(positions, history, s, job.is_complete());
        if paths.is_empty() {
            println!("    (no paths: stations not placed on the canvas)");
        }
        for path in &paths {
            print_path(path);
        }
    }
    Ok(())
}

fn print_path(path: &RoutedPath) {
    let points = path
        .points
        .iter()
        .map(|p| format!("({:.0}, {:.0})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" → ");
    println!(
        "    {:<10} {}  [{} arrow(s)]",
        kind_label(path.kind),
        points,
        path.arrows.len()
    );
}
