use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::timestamp;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Complete,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Top-left corner of a station box on the factory canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Customer {
    pub id: i64,
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 10, max = 20, message = "Phone must be between 10 and 20 characters"))]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Address must be between 1 and 200 characters"))]
    pub address: String,
    #[serde(with = "timestamp")]
    pub date_created: DateTime<Utc>,
}

/// Payload for creating or updating a customer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerDraft {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 10, max = 20, message = "Phone must be between 10 and 20 characters"))]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Address must be between 1 and 200 characters"))]
    pub address: String,
}

/// A physical station (the backend calls them assets).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Station {
    pub id: i64,
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub current_jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewStation {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "Manufacturer is required"))]
    pub manufacturer: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One visit of a job to a station. `departure_time == None` means the job
/// is still there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLocation {
    pub id: i64,
    pub job_id: i64,
    pub asset_id: i64,
    #[serde(with = "timestamp")]
    pub arrival_time: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Station>,
}

impl JobLocation {
    pub fn is_open(&self) -> bool {
        self.departure_time.is_none()
    }

    /// Minutes spent at the station, up to `now` while still there. Never
    /// negative, even when the departure is stamped before the arrival.
    pub fn stay_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.departure_time.unwrap_or(now) - self.arrival_time)
            .num_minutes()
            .max(0)
    }

    pub fn station_name(&self) -> String {
        match &self.asset {
            Some(asset) => asset.name.clone(),
            None => format!("Station {}", self.asset_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Job {
    pub id: i64,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: JobStatus,
    pub customer_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(default, with = "timestamp::option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub date_created: DateTime<Utc>,
    /// Location history, oldest first. Filled in by the services when
    /// history is requested.
    #[serde(default)]
    pub locations: Vec<JobLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<JobLocation>,
}

impl Job {
    pub fn customer_name(&self) -> &str {
        self.customer.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }

    /// Past its due date and not yet complete.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.is_complete() && due < now,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewJob {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub customer_id: i64,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserDraft {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Username must be between 1 and 100 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be between 8 and 100 characters"))]
    pub password: String,
}

#[derive(Clone, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, max = 100, message = "Username must be between 1 and 100 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be between 8 and 100 characters"))]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The station a job currently occupies: the open history entry with the
/// latest arrival time.
pub fn current_location(history: &[JobLocation]) -> Option<&JobLocation> {
    history
        .iter()
        .filter(|entry| entry.is_open())
        .max_by_key(|entry| entry.arrival_time)
}
