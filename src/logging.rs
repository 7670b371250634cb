//! Tracing setup and remote log shipping.
//!
//! Logs go to stderr (warnings only unless `--verbose`), to a daily-rotated
//! file in the configured log directory, and optionally to the backend's
//! log endpoints through [`RemoteLogs`].

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::client::ApiClient;
use crate::config::LoggingConfig;
use crate::errors::ApiError;
use crate::services::logs::{LogChannel, LogEntry, ship_logs};

/// Entries kept while the backend is unreachable; older ones are dropped.
pub const MAX_BUFFERED_LOGS: usize = 1000;

/// How often long-running commands ship buffered entries.
pub const LOG_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

const LOG_FILE_PREFIX: &str = "floortrack.log";

type Buffer = Arc<Mutex<VecDeque<LogEntry>>>;

fn push_bounded(buffer: &mut VecDeque<LogEntry>, entry: LogEntry) {
    buffer.push_back(entry);
    while buffer.len() > MAX_BUFFERED_LOGS {
        buffer.pop_front();
    }
}

/// Buffer of log entries waiting to be shipped to one log endpoint.
#[derive(Debug, Clone)]
pub struct RemoteLogs {
    channel: LogChannel,
    buffer: Buffer,
}

impl RemoteLogs {
    pub fn new(channel: LogChannel) -> Self {
        Self {
            channel,
            buffer: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn channel(&self) -> LogChannel {
        self.channel
    }

    /// Layer that records `floortrack` events at `level` and above into
    /// this buffer.
    pub fn layer(&self, level: Level) -> RemoteLogLayer {
        RemoteLogLayer {
            buffer: self.buffer.clone(),
            level,
        }
    }

    pub fn record(&self, entry: LogEntry) {
        if let Ok(mut buffer) = self.buffer.lock() {
            push_bounded(&mut buffer, entry);
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ship everything buffered. On failure the entries go back in front of
    /// anything logged meanwhile, still capped at [`MAX_BUFFERED_LOGS`].
    pub async fn flush(&self, api: &ApiClient) -> Result<usize, ApiError> {
        let batch: Vec<LogEntry> = match self.buffer.lock() {
            Ok(mut buffer) => buffer.drain(..).collect(),
            Err(_) => return Ok(0),
        };
        if batch.is_empty() {
            return Ok(0);
        }

        let sent = batch.len();
        match ship_logs(api, self.channel, &batch).await {
            Ok(()) => Ok(sent),
            Err(e) => {
                if let Ok(mut buffer) = self.buffer.lock() {
                    let newer: Vec<LogEntry> = buffer.drain(..).collect();
                    for entry in batch.into_iter().chain(newer) {
                        push_bounded(&mut buffer, entry);
                    }
                }
                Err(e)
            }
        }
    }
}

pub struct RemoteLogLayer {
    buffer: Buffer,
    level: Level,
}

impl<S> Layer<S> for RemoteLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let metadata = event.metadata();
        // Only our own events; HTTP internals would feed back into shipping.
        if !metadata.target().starts_with("floortrack") || *metadata.level() > self.level {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);
        visitor
            .context
            .insert("target".to_string(), Value::from(metadata.target()));

        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level_name(metadata.level()).to_string(),
            message: visitor.message.unwrap_or_default(),
            context: visitor.context,
        };
        if let Ok(mut buffer) = self.buffer.lock() {
            push_bounded(&mut buffer, entry);
        }
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        _ => "DEBUG",
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: Option<String>,
    context: Map<String, Value>,
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.context
                .insert(field.name().to_string(), Value::from(format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.context
                .insert(field.name().to_string(), Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.context.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.context.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.context.insert(field.name().to_string(), Value::from(value));
    }
}

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop and must live until the process exits.
pub fn init_logging(
    config: &LoggingConfig,
    verbose: bool,
    remote: Option<&RemoteLogs>,
) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { config.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log level")?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let remote_layer = remote.map(|logs| logs.layer(Level::INFO));

    // A second init (tests, repeated runs in one process) keeps the first.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .with(remote_layer)
        .try_init();

    Ok(guard)
}
