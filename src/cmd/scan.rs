//! Scanner workflow for `floortrack scan`.
//!
//! Takes the decoded text of a job QR code, shows the job and where it is,
//! then moves it to a station or completes it. Events are logged to the
//! scanner log channel.

use anyhow::{Result, bail};
use tracing::{debug, error, info};

use floortrack::app::App;
use floortrack::common::qr::parse_qr_payload;
use floortrack::services::jobs::{complete_job, get_job, job_current_location, move_job};
use floortrack::services::stations::list_stations;
use floortrack::ui::{Table, icons, status_cell};

use super::{optional, theme};

pub async fn cmd_scan(
    app: &App,
    payload: &str,
    move_to: Option<i64>,
    complete: bool,
) -> Result<()> {
    let scanned = match parse_qr_payload(payload) {
        Ok(scanned) => scanned,
        Err(e) => {
            error!(decoded_text = payload, "Error processing QR code");
            bail!(e);
        }
    };
    info!(job_id = scanned.job, "QR code scanned successfully");

    let (job, location, stations) = futures::try_join!(
        get_job(&app.api, scanned.job),
        job_current_location(&app.api, scanned.job),
        list_stations(&app.api)
    )
    .inspect_err(|e| error!(job_id = scanned.job, error = %e, "Error fetching job details"))?;
    info!(job_id = job.id, job_name = %job.name, "Job details retrieved");
    debug!(asset_count = stations.len(), "Assets retrieved");

    println!();
    println!("{}{}", icons::SCAN, console::style(&job.name).bold());
    println!("  Job:      {}", job.id);
    println!("  Status:   {}", status_cell(job.status, theme(app)));
    println!("  Customer: {}", optional(Some(job.customer_name())));
    println!(
        "  Station:  {}",
        location
            .as_ref()
            .map(|l| l.station_name())
            .unwrap_or_else(|| "-".to_string())
    );
    println!();

    if let Some(station_id) = move_to {
        let Some(station) = stations.iter().find(|s| s.id == station_id) else {
            bail!("Unknown station {}", station_id);
        };
        move_job(&app.api, job.id, station_id)
            .await
            .inspect_err(|e| error!(job_id = job.id, station_id, error = %e, "Error moving job"))?;
        info!(job_id = job.id, station_id, station_name = %station.name, "Job moved to station");
        println!("{}Moved to {}", icons::MOVE, console::style(&station.name).bold());
        return Ok(());
    }

    if complete {
        complete_job(&app.api, job.id)
            .await
            .inspect_err(|e| error!(job_id = job.id, error = %e, "Error completing job"))?;
        info!(job_id = job.id, "Job completed");
        println!("{}Job completed successfully", icons::CHECK);
        return Ok(());
    }

    let mut table = Table::new(["ID", "Station"]);
    for station in &stations {
        table.row([station.id.to_string(), station.name.clone()]);
    }
    println!("{}", table.render());
    println!();
    println!("Use --move-to <station> to move the job, or --complete to finish it.");
    Ok(())
}
