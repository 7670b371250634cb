use std::collections::HashMap;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use floortrack_common::{Job, NewStation, Position, Station};

use crate::client::{ApiClient, validate_all};
use crate::errors::ApiError;

#[derive(Serialize)]
struct PositionUpdate {
    position: Position,
}

pub async fn list_stations(api: &ApiClient) -> Result<Vec<Station>, ApiError> {
    let path = "/assets/";
    let stations: Vec<Station> = api.get(path).await?;
    validate_all(path, &stations)?;
    Ok(stations)
}

/// Station id → station, from one listing.
pub async fn station_map(api: &ApiClient) -> Result<HashMap<i64, Station>, ApiError> {
    Ok(list_stations(api)
        .await?
        .into_iter()
        .map(|station| (station.id, station))
        .collect())
}

pub async fn get_station(api: &ApiClient, station_id: i64) -> Result<Station, ApiError> {
    api.get_validated(&format!("/assets/{}", station_id)).await
}

pub async fn create_station(api: &ApiClient, station: &NewStation) -> Result<Station, ApiError> {
    station.validate()?;
    let created: Station = api.post("/assets/", station).await?;
    info!(station_id = created.id, name = %created.name, "Station created");
    Ok(created)
}

pub async fn delete_station(api: &ApiClient, station_id: i64) -> Result<(), ApiError> {
    api.delete(&format!("/assets/{}", station_id)).await?;
    info!(station_id, "Station deleted");
    Ok(())
}

pub async fn station_current_jobs(api: &ApiClient, station_id: i64) -> Result<Vec<Job>, ApiError> {
    let path = format!("/assets/{}/current_jobs", station_id);
    let jobs: Vec<Job> = api.get(&path).await?;
    validate_all(&path, &jobs)?;
    Ok(jobs)
}

pub async fn update_station_position(
    api: &ApiClient,
    station_id: i64,
    position: Position,
) -> Result<Station, ApiError> {
    api.patch(
        &format!("/assets/{}/position", station_id),
        &PositionUpdate { position },
    )
    .await
}

/// Every station with the jobs currently at it (the station tracker).
pub async fn stations_with_jobs(api: &ApiClient) -> Result<Vec<Station>, ApiError> {
    let mut stations = list_stations(api).await?;
    let jobs = try_join_all(
        stations
            .iter()
            .map(|station| station_current_jobs(api, station.id)),
    )
    .await?;
    for (station, current) in stations.iter_mut().zip(jobs) {
        station.current_jobs = current;
    }
    Ok(stations)
}
