//! Station commands for `floortrack stations`.

use anyhow::Result;
use chrono::Utc;

use floortrack::app::App;
use floortrack::common::filter::station_matches;
use floortrack::common::{NewStation, Station};
use floortrack::poll::continue_unless_signed_out;
use floortrack::services::stations::{
    create_station, delete_station, get_station, list_stations, station_current_jobs,
    stations_with_jobs,
};
use floortrack::ui::{Table, icons};
use floortrack::view::Theme;

use super::super::StationsCommands;
use super::jobs::jobs_table;
use super::{confirm, listed, optional, refreshed_line, theme, watch};

pub async fn cmd_stations(app: &App, command: StationsCommands) -> Result<()> {
    match command {
        StationsCommands::List { search } => {
            let search = search.unwrap_or_default();
            let stations = listed("stations", list_stations(&app.api).await);
            let matching: Vec<&Station> = stations
                .iter()
                .filter(|s| station_matches(s, &search, false))
                .collect();

            println!();
            if matching.is_empty() {
                println!("No stations found.");
                println!();
                return Ok(());
            }
            let mut table = Table::new(["ID", "Name", "Manufacturer", "Model", "Description"]);
            for station in &matching {
                table.row([
                    station.id.to_string(),
                    station.name.clone(),
                    station.manufacturer.clone(),
                    station.model.clone(),
                    optional(station.description.as_deref()).to_string(),
                ]);
            }
            println!("{}", table.render());
            println!();
            println!("{} station(s)", matching.len());
        }
        StationsCommands::Show { id } => {
            let (station, jobs) = futures::try_join!(
                get_station(&app.api, id),
                station_current_jobs(&app.api, id)
            )?;
            println!();
            println!("{}{}", icons::STATION, console::style(&station.name).bold());
            println!("  ID:           {}", station.id);
            println!("  Manufacturer: {}", station.manufacturer);
            println!("  Model:        {}", station.model);
            println!("  Description:  {}", optional(station.description.as_deref()));
            println!();
            if jobs.is_empty() {
                println!("No jobs at this station.");
            } else {
                let refs: Vec<_> = jobs.iter().collect();
                println!("{}", jobs_table(&refs, theme(app), Utc::now()).render());
            }
            println!();
        }
        StationsCommands::Create {
            name,
            manufacturer,
            model,
            description,
        } => {
            let station = create_station(
                &app.api,
                &NewStation {
                    name,
                    manufacturer,
                    model,
                    description,
                },
            )
            .await?;
            println!("{}Created station {} ({})", icons::CHECK, station.id, station.name);
        }
        StationsCommands::Delete { id, force } => {
            if !confirm(&format!("Delete station {}?", id), force)? {
                return Ok(());
            }
            delete_station(&app.api, id).await?;

            // Forget its place on the factory canvas.
            let positions = app.view.station_positions()?;
            if positions.contains_key(&id) {
                let keep: Vec<i64> = positions.keys().copied().filter(|k| *k != id).collect();
                app.view.prune_station_positions(&keep)?;
            }
            println!("Deleted station {}.", id);
        }
        StationsCommands::Tracker {
            search,
            with_jobs,
            watch: keep_watching,
        } => {
            let search = search.unwrap_or_default();
            if !keep_watching {
                let stations = listed("stations", stations_with_jobs(&app.api).await);
                print_tracker(&stations, &search, with_jobs, theme(app));
                return Ok(());
            }

            let secs = app.config.polling().stations_secs;
            watch(app, secs, || {
                let search = search.clone();
                async move {
                    let result = stations_with_jobs(&app.api).await;
                    let flow = continue_unless_signed_out(&result);
                    let stations = listed("stations", result);
                    print_tracker(&stations, &search, with_jobs, theme(app));
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

fn print_tracker(stations: &[Station], search: &str, with_jobs: bool, theme: Theme) {
    let now = Utc::now();
    let matching: Vec<&Station> = stations
        .iter()
        .filter(|s| station_matches(s, search, with_jobs))
        .collect();

    println!();
    println!("{}Station Tracker", icons::STATION);
    println!();
    if matching.is_empty() {
        println!("No stations found.");
        return;
    }

    for station in matching {
        let overdue = station
            .current_jobs
            .iter()
            .filter(|job| job.is_overdue(now))
            .count();
        let mut header = format!(
            "{} ({} job(s))",
            console::style(&station.name).bold(),
            station.current_jobs.len()
        );
        if overdue > 0 {
            header.push_str(&format!(
                " {}",
                console::style(format!("{} overdue", overdue)).red()
            ));
        }
        println!("{}", header);
        if !station.current_jobs.is_empty() {
            let refs: Vec<_> = station.current_jobs.iter().collect();
            for line in jobs_table(&refs, theme, now).render().lines() {
                println!("    {}", line);
            }
        }
        println!();
    }
}
