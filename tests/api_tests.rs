//! Client and service tests against an in-process fake backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;

use floortrack::app::App;
use floortrack::client::ApiClient;
use floortrack::config::{Config, FloortrackToml};
use floortrack::common::{Credentials, CustomerDraft, JobStatus, Position};
use floortrack::errors::ApiError;
use floortrack::logging::RemoteLogs;
use floortrack::services::customers::{create_customer, list_customers};
use floortrack::services::jobs::{
    complete_job, job_current_location, jobs_by_id_with_history, jobs_with_history, list_jobs,
    move_job,
};
use floortrack::services::logs::{LogChannel, LogEntry};
use floortrack::services::stations::{stations_with_jobs, update_station_position};
use floortrack::services::users::current_user;
use floortrack::session::{MemoryTokenStore, Session};

const PASSWORD: &str = "correct-horse";

fn token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(json!({ "sub": "operator", "exp": exp }).to_string());
    format!("{}.{}.signature", header, claims)
}

/// The only token the backend accepts; expires in 2100.
fn good_token() -> String {
    token(4_102_444_800)
}

// =============================================================================
// Fake backend
// =============================================================================

#[derive(Default)]
struct Backend {
    history: Vec<Value>,
    statuses: HashMap<i64, String>,
    authorized_requests: usize,
    customer_posts: usize,
    logs: Vec<Value>,
}

type Shared = Arc<Mutex<Backend>>;

fn authorize(backend: &Shared, headers: &HeaderMap) -> Result<(), StatusCode> {
    backend.lock().unwrap().authorized_requests += 1;
    let expected = format!("Bearer {}", good_token());
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn station(id: i64) -> Option<Value> {
    let (name, model) = match id {
        10 => ("Laser Cutter", "L1"),
        11 => ("Press Brake", "P2"),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": name,
        "manufacturer": "Trumpf",
        "model": model,
        "description": null,
    }))
}

fn job(backend: &Backend, id: i64) -> Option<Value> {
    let name = match id {
        1 => "Bracket",
        2 => "Hinge",
        _ => return None,
    };
    let status = backend
        .statuses
        .get(&id)
        .cloned()
        .unwrap_or_else(|| "in_progress".to_string());
    Some(json!({
        "id": id,
        "name": name,
        "description": null,
        "status": status,
        "customer_id": 5,
        "due_date": null,
        "date_created": "2024-01-01T00:00:00Z",
    }))
}

fn seeded() -> Shared {
    let backend = Backend {
        history: vec![
            json!({"id": 1, "job_id": 1, "asset_id": 10,
                   "arrival_time": "2024-01-01T08:00:00Z",
                   "departure_time": "2024-01-01T10:00:00Z"}),
            json!({"id": 2, "job_id": 1, "asset_id": 11,
                   "arrival_time": "2024-01-01T10:00:00Z", "departure_time": null}),
            json!({"id": 3, "job_id": 2, "asset_id": 10,
                   "arrival_time": "2024-01-02T08:00:00Z", "departure_time": null}),
        ],
        ..Backend::default()
    };
    Arc::new(Mutex::new(backend))
}

async fn sign_in(Form(form): Form<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    if form.get("password").map(String::as_str) != Some(PASSWORD) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({ "access_token": good_token(), "token_type": "bearer" })))
}

async fn list_jobs_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let backend = backend.lock().unwrap();
    Ok(Json(json!([job(&backend, 1), job(&backend, 2)])))
}

async fn get_job_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let backend = backend.lock().unwrap();
    job(&backend, id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn history_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let backend = backend.lock().unwrap();
    let entries: Vec<Value> = backend
        .history
        .iter()
        .filter(|entry| entry["job_id"] == json!(id))
        .cloned()
        .collect();
    Ok(Json(Value::Array(entries)))
}

async fn move_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let asset_id: i64 = query
        .get("asset_id")
        .and_then(|v| v.parse().ok())
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut backend = backend.lock().unwrap();
    for entry in backend.history.iter_mut() {
        if entry["job_id"] == json!(id) && entry["departure_time"].is_null() {
            entry["departure_time"] = json!(now);
        }
    }
    let next_id = backend.history.len() as i64 + 1;
    backend.history.push(json!({
        "id": next_id, "job_id": id, "asset_id": asset_id,
        "arrival_time": now, "departure_time": null,
    }));
    job(&backend, id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn status_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let status = query
        .get("status")
        .cloned()
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let mut backend = backend.lock().unwrap();
    backend.statuses.insert(id, status);
    job(&backend, id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn list_assets_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    Ok(Json(json!([station(10), station(11)])))
}

async fn current_jobs_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let backend = backend.lock().unwrap();
    let jobs: Vec<Value> = backend
        .history
        .iter()
        .filter(|entry| entry["asset_id"] == json!(id) && entry["departure_time"].is_null())
        .filter_map(|entry| entry["job_id"].as_i64())
        .filter_map(|job_id| job(&backend, job_id))
        .collect();
    Ok(Json(Value::Array(jobs)))
}

async fn position_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    let mut station = station(id).ok_or(StatusCode::NOT_FOUND)?;
    station["position"] = body["position"].clone();
    Ok(Json(station))
}

async fn me_route(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&backend, &headers)?;
    Ok(Json(json!({
        "id": 7, "username": "operator", "email": "op@example.com", "is_active": true,
    })))
}

async fn customers_route() -> StatusCode {
    StatusCode::TOO_MANY_REQUESTS
}

async fn create_customer_route(State(backend): State<Shared>) -> StatusCode {
    backend.lock().unwrap().customer_posts += 1;
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn frontend_logs_route(
    State(backend): State<Shared>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut backend = backend.lock().unwrap();
    if let Some(entries) = body["logs"].as_array() {
        backend.logs.extend(entries.iter().cloned());
    }
    StatusCode::OK
}

async fn spawn_backend() -> (String, Shared) {
    let backend = seeded();
    let app = Router::new()
        .route("/token", post(sign_in))
        .route("/jobs/", get(list_jobs_route))
        .route("/jobs/{id}", get(get_job_route))
        .route("/jobs/{id}/location_history", get(history_route))
        .route("/jobs/{id}/move", post(move_route))
        .route("/jobs/{id}/status", post(status_route))
        .route("/assets/", get(list_assets_route))
        .route("/assets/{id}/current_jobs", get(current_jobs_route))
        .route("/assets/{id}/position", patch(position_route))
        .route("/users/me", get(me_route))
        .route("/customers/", get(customers_route).post(create_customer_route))
        .route("/logs/frontend", post(frontend_logs_route))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), backend)
}

fn client(base_url: &str, session: Session) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5), session).unwrap()
}

fn signed_in(base_url: &str) -> ApiClient {
    client(base_url, Session::new(MemoryTokenStore::with_token(&good_token())))
}

// =============================================================================
// Session
// =============================================================================

mod session {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_stores_token() {
        let (url, _) = spawn_backend().await;
        let api = client(&url, Session::in_memory());

        api.sign_in(&Credentials {
            username: "operator".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();

        assert_eq!(api.session().token().unwrap(), Some(good_token()));
        assert!(api.session().validate_current().unwrap());
        assert_eq!(current_user(&api).await.unwrap().username, "operator");
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let (url, _) = spawn_backend().await;
        let api = client(&url, Session::in_memory());

        let err = api
            .sign_in(&Credentials {
                username: "operator".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(api.session().token().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_password_rejected_before_sending() {
        let api = client("http://127.0.0.1:9", Session::in_memory());
        let err = api
            .sign_in(&Credentials {
                username: "operator".to_string(),
                password: "short".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(fields) if fields.contains_key("password")));
    }

    #[tokio::test]
    async fn test_rejected_token_signs_out() {
        let (url, _) = spawn_backend().await;
        let api = client(
            &url,
            Session::new(MemoryTokenStore::with_token(&token(4_102_444_801))),
        );

        let err = list_jobs(&api).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert!(err.requires_sign_in());
        assert!(api.session().token().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_never_reaches_server() {
        let (url, backend) = spawn_backend().await;
        let api = client(&url, Session::new(MemoryTokenStore::with_token(&token(1))));

        let err = list_jobs(&api).await.unwrap_err();

        assert!(matches!(err, ApiError::SessionExpired));
        assert!(api.session().token().unwrap().is_none());
        assert_eq!(backend.lock().unwrap().authorized_requests, 0);
    }
}

// =============================================================================
// Errors
// =============================================================================

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_rate_limited() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        let err = list_customers(&api).await.unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        assert_eq!(err.to_string(), "Too many requests. Please try again later.");
        assert!(api.session().token().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_customer_never_sent() {
        let (url, backend) = spawn_backend().await;
        let api = signed_in(&url);
        let draft = CustomerDraft {
            name: "Acme".to_string(),
            email: "not-an-email".to_string(),
            phone: "123".to_string(),
            address: "1 Main St".to_string(),
        };

        let err = create_customer(&api, &draft).await.unwrap_err();

        let ApiError::Validation(fields) = err else {
            panic!("expected validation error, got {:?}", err);
        };
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
        assert_eq!(backend.lock().unwrap().customer_posts, 0);
    }

    #[tokio::test]
    async fn test_server_error_is_generic() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);
        let draft = CustomerDraft {
            name: "Acme".to_string(),
            email: "ops@acme.test".to_string(),
            phone: "5551234567".to_string(),
            address: "1 Main St".to_string(),
        };

        let err = create_customer(&api, &draft).await.unwrap_err();

        assert!(matches!(err, ApiError::Unexpected));
        assert_eq!(err.to_string(), "An unexpected error occurred. Please try again.");
    }
}

// =============================================================================
// Jobs and stations
// =============================================================================

mod jobs {
    use super::*;

    #[tokio::test]
    async fn test_list_jobs_resolves_current_location() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        let jobs = list_jobs(&api).await.unwrap();

        assert_eq!(jobs.len(), 2);
        let bracket = jobs.iter().find(|j| j.id == 1).unwrap();
        let here = bracket.current_location.as_ref().unwrap();
        assert_eq!(here.asset_id, 11);
        assert_eq!(here.station_name(), "Press Brake");
        assert!(bracket.locations.is_empty());
    }

    #[tokio::test]
    async fn test_move_job_updates_location() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        move_job(&api, 1, 10).await.unwrap();

        let here = job_current_location(&api, 1).await.unwrap().unwrap();
        assert_eq!(here.asset_id, 10);
        assert!(here.departure_time.is_none());

        let jobs = jobs_with_history(&api).await.unwrap();
        let bracket = jobs.iter().find(|j| j.id == 1).unwrap();
        assert_eq!(bracket.locations.len(), 3);
        assert_eq!(bracket.locations.iter().filter(|l| l.is_open()).count(), 1);
    }

    #[tokio::test]
    async fn test_complete_job() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        let job = complete_job(&api, 2).await.unwrap();

        assert_eq!(job.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_jobs_by_id_skips_missing_jobs() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        let jobs = jobs_by_id_with_history(&api, &[1, 3]).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, 1);
        assert_eq!(jobs[0].locations.len(), 2);
        assert_eq!(jobs[0].locations[0].station_name(), "Laser Cutter");
        assert!(jobs_by_id_with_history(&api, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_station_tracker() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        let stations = stations_with_jobs(&api).await.unwrap();

        let laser = stations.iter().find(|s| s.id == 10).unwrap();
        let press = stations.iter().find(|s| s.id == 11).unwrap();
        assert_eq!(laser.current_jobs.len(), 1);
        assert_eq!(laser.current_jobs[0].name, "Hinge");
        assert_eq!(press.current_jobs[0].name, "Bracket");
    }

    #[tokio::test]
    async fn test_update_station_position() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);

        let station = update_station_position(&api, 11, Position::new(120.0, 80.0))
            .await
            .unwrap();

        assert_eq!(station.position, Some(Position::new(120.0, 80.0)));
    }
}

// =============================================================================
// Remote logs
// =============================================================================

mod remote_logs {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: "2024-01-01T08:00:00.000Z".to_string(),
            level: "INFO".to_string(),
            message: message.to_string(),
            context: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_flush_ships_buffered_entries() {
        let (url, backend) = spawn_backend().await;
        let api = signed_in(&url);
        let logs = RemoteLogs::new(LogChannel::Frontend);
        logs.record(entry("Job moved to station"));
        logs.record(entry("Job completed"));

        assert_eq!(logs.flush(&api).await.unwrap(), 2);

        assert_eq!(logs.pending(), 0);
        let shipped = &backend.lock().unwrap().logs;
        assert_eq!(shipped.len(), 2);
        assert_eq!(shipped[0]["message"], "Job moved to station");
        assert_eq!(shipped[1]["level"], "INFO");
    }

    async fn wait_for_logs(backend: &Shared, count: usize) -> usize {
        for _ in 0..200 {
            let shipped = backend.lock().unwrap().logs.len();
            if shipped >= count {
                return shipped;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        backend.lock().unwrap().logs.len()
    }

    #[tokio::test]
    async fn test_logs_ship_while_command_keeps_running() {
        let (url, backend) = spawn_backend().await;
        let dir = TempDir::new().unwrap();
        let mut toml = FloortrackToml::default();
        toml.storage.data_dir = Some(dir.path().to_path_buf());
        let config = Config::resolve(
            dir.path().join("floortrack.toml"),
            toml,
            |_| None,
            Some(url.as_str()),
        );
        let logs = RemoteLogs::new(LogChannel::Frontend);
        let app = App::new(config, Some(logs.clone())).unwrap();
        let (stop, stop_rx) = watch::channel(false);

        logs.record(entry("Job moved to station"));
        let running = async {
            let first = wait_for_logs(&backend, 1).await;
            logs.record(entry("Job completed"));
            let second = wait_for_logs(&backend, 2).await;
            stop.send(true).unwrap();
            (first, second)
        };
        let (_, (first, second)) = tokio::join!(
            app.ship_logs_every(Duration::from_millis(20), stop_rx),
            running
        );

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(logs.pending(), 0);
        assert_eq!(backend.lock().unwrap().logs[1]["message"], "Job completed");
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_entries() {
        let (url, _) = spawn_backend().await;
        let api = signed_in(&url);
        // No scanner endpoint on this backend.
        let logs = RemoteLogs::new(LogChannel::Scanner);
        logs.record(entry("QR code scanned successfully"));

        assert!(logs.flush(&api).await.is_err());
        assert_eq!(logs.pending(), 1);
    }
}
