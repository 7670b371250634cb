use std::collections::HashMap;

use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tracing::{debug, info, warn};
use validator::Validate;

use floortrack_common::{Job, JobLocation, JobStatus, NewJob, Station, current_location};

use crate::client::{ApiClient, validate_all};
use crate::errors::ApiError;
use crate::services::stations;

#[derive(Serialize)]
struct MoveQuery {
    asset_id: i64,
}

#[derive(Serialize)]
struct StatusQuery {
    status: JobStatus,
}

async fn fetch_jobs(api: &ApiClient) -> Result<Vec<Job>, ApiError> {
    let path = "/jobs/";
    let jobs: Vec<Job> = api.get(path).await?;
    validate_all(path, &jobs)?;
    Ok(jobs)
}

/// History as stored, oldest first, without station details.
async fn raw_history(api: &ApiClient, job_id: i64) -> Result<Vec<JobLocation>, ApiError> {
    let mut history: Vec<JobLocation> = api
        .get(&format!("/jobs/{}/location_history", job_id))
        .await?;
    history.sort_by_key(|entry| entry.arrival_time);
    Ok(history)
}

fn resolve_assets(history: &mut [JobLocation], assets: &HashMap<i64, Station>) {
    for entry in history.iter_mut() {
        if entry.asset.is_none() {
            entry.asset = assets.get(&entry.asset_id).cloned();
        }
    }
}

/// Fetch every job's history concurrently and resolve stations from a
/// single listing. Any failed fetch fails the batch.
async fn attach_history(
    api: &ApiClient,
    mut jobs: Vec<Job>,
    keep_locations: bool,
) -> Result<Vec<Job>, ApiError> {
    if jobs.is_empty() {
        return Ok(jobs);
    }
    let (histories, assets) = futures::try_join!(
        try_join_all(jobs.iter().map(|job| raw_history(api, job.id))),
        stations::station_map(api),
    )?;
    debug!(jobs = jobs.len(), stations = assets.len(), "history batch resolved");

    for (job, mut history) in jobs.iter_mut().zip(histories) {
        resolve_assets(&mut history, &assets);
        job.current_location = current_location(&history).cloned();
        if keep_locations {
            job.locations = history;
        }
    }
    Ok(jobs)
}

/// All jobs, each with its current location resolved.
pub async fn list_jobs(api: &ApiClient) -> Result<Vec<Job>, ApiError> {
    let jobs = fetch_jobs(api).await?;
    attach_history(api, jobs, false).await
}

/// All jobs with their full location history, as used by the export and
/// the timeline.
pub async fn jobs_with_history(api: &ApiClient) -> Result<Vec<Job>, ApiError> {
    let jobs = fetch_jobs(api).await?;
    attach_history(api, jobs, true).await
}

/// The given jobs with their full history, fetched concurrently. A job
/// that fails to load is logged and left out, unless the failure ended the
/// session. Stations come from one listing.
pub async fn jobs_by_id_with_history(api: &ApiClient, job_ids: &[i64]) -> Result<Vec<Job>, ApiError> {
    if job_ids.is_empty() {
        return Ok(Vec::new());
    }
    let assets = stations::station_map(api).await?;
    let results = join_all(job_ids.iter().map(|&job_id| async move {
        futures::try_join!(get_job(api, job_id), raw_history(api, job_id))
            .inspect_err(|e| warn!(job_id, error = %e, "Failed to load job"))
    }))
    .await;

    let mut jobs = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok((mut job, mut history)) => {
                resolve_assets(&mut history, &assets);
                job.current_location = current_location(&history).cloned();
                job.locations = history;
                jobs.push(job);
            }
            Err(e) if e.requires_sign_in() => return Err(e),
            Err(_) => {}
        }
    }
    Ok(jobs)
}

pub async fn get_job(api: &ApiClient, job_id: i64) -> Result<Job, ApiError> {
    api.get_validated(&format!("/jobs/{}", job_id)).await
}

pub async fn create_job(api: &ApiClient, job: &NewJob) -> Result<Job, ApiError> {
    job.validate()?;
    let created: Job = api.post("/jobs/", job).await?;
    info!(job_id = created.id, name = %created.name, "Job created");
    Ok(created)
}

/// Move a job to a station. The backend closes the open history entry and
/// opens one at the new station.
pub async fn move_job(api: &ApiClient, job_id: i64, station_id: i64) -> Result<Job, ApiError> {
    let job: Job = api
        .post_query(
            &format!("/jobs/{}/move", job_id),
            &MoveQuery {
                asset_id: station_id,
            },
        )
        .await?;
    info!(job_id, station_id, "Job moved");
    Ok(job)
}

pub async fn update_job_status(
    api: &ApiClient,
    job_id: i64,
    status: JobStatus,
) -> Result<Job, ApiError> {
    let job: Job = api
        .post_query(&format!("/jobs/{}/status", job_id), &StatusQuery { status })
        .await?;
    info!(job_id, status = %status, "Job status updated");
    Ok(job)
}

pub async fn complete_job(api: &ApiClient, job_id: i64) -> Result<Job, ApiError> {
    update_job_status(api, job_id, JobStatus::Complete).await
}

/// History of one job, oldest first, with each entry's station resolved.
pub async fn job_history(api: &ApiClient, job_id: i64) -> Result<Vec<JobLocation>, ApiError> {
    let (mut history, assets) =
        futures::try_join!(raw_history(api, job_id), stations::station_map(api))?;
    resolve_assets(&mut history, &assets);
    Ok(history)
}

pub async fn job_current_location(
    api: &ApiClient,
    job_id: i64,
) -> Result<Option<JobLocation>, ApiError> {
    let history = job_history(api, job_id).await?;
    Ok(current_location(&history).cloned())
}

pub async fn customer_jobs(api: &ApiClient, customer_id: i64) -> Result<Vec<Job>, ApiError> {
    let jobs = fetch_jobs(api).await?;
    Ok(jobs
        .into_iter()
        .filter(|job| job.customer_id == customer_id)
        .collect())
}
