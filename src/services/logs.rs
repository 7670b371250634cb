use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::ApiClient;
use crate::errors::ApiError;

/// Which client the shipped logs belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannel {
    Frontend,
    Scanner,
}

impl LogChannel {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Frontend => "/logs/frontend",
            Self::Scanner => "/logs/scanner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    /// `ERROR`, `WARN`, `INFO` or `DEBUG`.
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

#[derive(Serialize)]
struct LogBatch<'a> {
    logs: &'a [LogEntry],
}

pub async fn ship_logs(
    api: &ApiClient,
    channel: LogChannel,
    entries: &[LogEntry],
) -> Result<(), ApiError> {
    if entries.is_empty() {
        return Ok(());
    }
    api.post_discard(channel.path(), &LogBatch { logs: entries })
        .await
}
