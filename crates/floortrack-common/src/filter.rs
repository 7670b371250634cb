//! Search and status filters behind the list views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Customer, Job, JobStatus, Station, User};

/// Single-choice status filter of the jobs list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Complete,
    Overdue,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Overdue => "overdue",
        }
    }

    pub fn matches(&self, job: &Job, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Active => job.status != JobStatus::Complete,
            Self::Complete => job.status == JobStatus::Complete,
            Self::Overdue => job.is_overdue(now),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "complete" => Ok(Self::Complete),
            "overdue" => Ok(Self::Overdue),
            _ => Err(format!("Invalid status filter: {}", s)),
        }
    }
}

/// Tag used by the multi-select filters of the timeline and factory views.
/// A job carries its status tag, plus `Overdue` when overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTag {
    Pending,
    InProgress,
    Complete,
    Cancelled,
    Overdue,
}

impl JobTag {
    pub const ALL: [JobTag; 5] = [
        JobTag::Pending,
        JobTag::InProgress,
        JobTag::Complete,
        JobTag::Cancelled,
        JobTag::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            other => other.status().map(|s| s.as_str()).unwrap_or_default(),
        }
    }

    fn status(&self) -> Option<JobStatus> {
        match self {
            Self::Pending => Some(JobStatus::Pending),
            Self::InProgress => Some(JobStatus::InProgress),
            Self::Complete => Some(JobStatus::Complete),
            Self::Cancelled => Some(JobStatus::Cancelled),
            Self::Overdue => None,
        }
    }
}

impl From<JobStatus> for JobTag {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => Self::Pending,
            JobStatus::InProgress => Self::InProgress,
            JobStatus::Complete => Self::Complete,
            JobStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl fmt::Display for JobTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "overdue" {
            return Ok(Self::Overdue);
        }
        s.parse::<JobStatus>()
            .map(Self::from)
            .map_err(|_| format!("Invalid status tag: {}", s))
    }
}

pub fn job_tags(job: &Job, now: DateTime<Utc>) -> Vec<JobTag> {
    let mut tags = vec![JobTag::from(job.status)];
    if job.is_overdue(now) {
        tags.push(JobTag::Overdue);
    }
    tags
}

/// Empty selection matches everything; otherwise any shared tag matches.
pub fn matches_tags(job: &Job, selected: &[JobTag], now: DateTime<Utc>) -> bool {
    selected.is_empty() || job_tags(job, now).iter().any(|tag| selected.contains(tag))
}

/// Number of jobs carrying each tag. Every tag is present, zero or not.
pub fn tag_counts(jobs: &[Job], now: DateTime<Utc>) -> BTreeMap<JobTag, usize> {
    let mut counts: BTreeMap<JobTag, usize> = JobTag::ALL.iter().map(|t| (*t, 0)).collect();
    for job in jobs {
        for tag in job_tags(job, now) {
            *counts.entry(tag).or_default() += 1;
        }
    }
    counts
}

/// Search box plus status filter of the jobs list.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub search: String,
    pub status: StatusFilter,
}

impl JobQuery {
    pub fn matches(&self, job: &Job, now: DateTime<Utc>) -> bool {
        let needle = self.search.to_lowercase();
        let found = needle.is_empty()
            || job.name.to_lowercase().contains(&needle)
            || job
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || job.customer_name().to_lowercase().contains(&needle);
        found && self.status.matches(job, now)
    }

    pub fn apply<'a>(&self, jobs: &'a [Job], now: DateTime<Utc>) -> Vec<&'a Job> {
        jobs.iter().filter(|job| self.matches(job, now)).collect()
    }
}

pub fn station_matches(station: &Station, search: &str, only_with_jobs: bool) -> bool {
    if only_with_jobs && station.current_jobs.is_empty() {
        return false;
    }
    let needle = search.to_lowercase();
    needle.is_empty()
        || station.name.to_lowercase().contains(&needle)
        || station
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
}

/// Name, email and address compare case-insensitively; phone verbatim.
pub fn customer_matches(customer: &Customer, search: &str) -> bool {
    let needle = search.to_lowercase();
    needle.is_empty()
        || customer.name.to_lowercase().contains(&needle)
        || customer.email.to_lowercase().contains(&needle)
        || customer.address.to_lowercase().contains(&needle)
        || customer.phone.contains(search)
}

/// Matches against the string form of every field.
pub fn user_matches(user: &User, search: &str) -> bool {
    let needle = search.to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let created = user
        .date_created
        .as_ref()
        .map(crate::timestamp::display)
        .unwrap_or_default();
    [
        user.id.to_string(),
        user.username.clone(),
        user.email.clone(),
        user.is_active.to_string(),
        created,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}
