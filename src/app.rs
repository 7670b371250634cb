//! Process-wide handles built once at start-up and passed to the commands.

use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::config::Config;
use crate::logging::RemoteLogs;
use crate::poll::poll_until;
use crate::prefs::FilePreferenceStore;
use crate::session::{FileTokenStore, Session};
use crate::view::ViewState;

pub struct App {
    pub config: Config,
    pub api: ApiClient,
    pub view: ViewState,
    remote_logs: Option<RemoteLogs>,
}

impl App {
    /// Session and preferences live in the configured data directory.
    pub fn new(config: Config, remote_logs: Option<RemoteLogs>) -> Result<Self> {
        let session = Session::new(FileTokenStore::in_dir(&config.data_dir));
        let api = ApiClient::new(&config.base_url, config.timeout(), session)?;
        let view = ViewState::new(FilePreferenceStore::in_dir(&config.data_dir));
        debug!(
            base_url = %config.base_url,
            data_dir = %config.data_dir.display(),
            "app ready"
        );
        Ok(Self {
            config,
            api,
            view,
            remote_logs,
        })
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub fn remote_logs(&self) -> Option<&RemoteLogs> {
        self.remote_logs.as_ref()
    }

    /// Ship buffered log entries. Failures only warn; the entries stay
    /// buffered and are dropped with the process.
    pub async fn flush_logs(&self) {
        let Some(logs) = &self.remote_logs else {
            return;
        };
        match logs.flush(&self.api).await {
            Ok(0) => {}
            Ok(sent) => debug!(sent, channel = ?logs.channel(), "logs shipped"),
            Err(e) => warn!(error = %e, pending = logs.pending(), "Failed to ship logs"),
        }
    }

    /// Ship buffered logs every `period` until `stop` turns true. Returns
    /// at once when remote shipping is off.
    pub async fn ship_logs_every(&self, period: Duration, stop: watch::Receiver<bool>) {
        if self.remote_logs.is_none() {
            return;
        }
        poll_until(period, stop, move || async move {
            self.flush_logs().await;
            ControlFlow::Continue(())
        })
        .await;
    }
}
