//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module      | Commands handled                 |
//! |-------------|----------------------------------|
//! | `auth`      | `Login`, `Logout`, `Whoami`      |
//! | `jobs`      | `Jobs`                           |
//! | `stations`  | `Stations`                       |
//! | `customers` | `Customers`                      |
//! | `users`     | `Users`                          |
//! | `timeline`  | `Timeline`                       |
//! | `factory`   | `Factory`                        |
//! | `theme`     | `Theme`                          |
//! | `scan`      | `Scan`                           |
//! | `config`    | `Config`                         |

pub mod auth;
pub mod config;
pub mod customers;
pub mod factory;
pub mod jobs;
pub mod scan;
pub mod stations;
pub mod theme;
pub mod timeline;
pub mod users;

pub use auth::{cmd_login, cmd_logout, cmd_whoami};
pub use config::cmd_config;
pub use customers::cmd_customers;
pub use factory::cmd_factory;
pub use jobs::cmd_jobs;
pub use scan::cmd_scan;
pub use stations::cmd_stations;
pub use theme::cmd_theme;
pub use timeline::cmd_timeline;
pub use users::cmd_users;

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use console::Term;

use floortrack::app::App;
use floortrack::common::timestamp;
use floortrack::errors::ApiError;
use floortrack::logging::LOG_FLUSH_INTERVAL;
use floortrack::poll::{or_empty, poll_until, shutdown_on_ctrl_c};
use floortrack::view::Theme;

pub(crate) const SIGN_IN_HINT: &str = "Run 'floortrack login' to sign in again.";

/// Saved theme; an unreadable preference file falls back to the default.
pub(crate) fn theme(app: &App) -> Theme {
    app.view.theme().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read theme preference");
        Theme::default()
    })
}

/// List results as rendered: failures are logged and shown as empty.
pub(crate) fn listed<T>(what: &str, result: Result<Vec<T>, ApiError>) -> Vec<T> {
    if let Err(e) = &result
        && e.requires_sign_in()
    {
        eprintln!("{}", SIGN_IN_HINT);
    }
    or_empty(what, result)
}

pub(crate) fn parse_when(value: &str, flag: &str) -> Result<DateTime<Utc>> {
    match timestamp::parse(value) {
        Some(when) => Ok(when),
        None => bail!("Invalid {} '{}': expected YYYY-MM-DD or RFC 3339", flag, value),
    }
}

pub(crate) fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    if !confirmed {
        println!("Cancelled.");
    }
    Ok(confirmed)
}

pub(crate) fn optional(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// Clear the terminal and re-render every `secs` until Ctrl-C, shipping
/// buffered logs in the background.
pub(crate) async fn watch<F, Fut>(app: &App, secs: u64, mut render: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    let term = Term::stdout();
    let period = Duration::from_secs(secs.max(1));
    let (done, done_rx) = tokio::sync::watch::channel(false);
    let refresh = async {
        poll_until(period, shutdown_on_ctrl_c(), || {
            let _ = term.clear_screen();
            render()
        })
        .await;
        let _ = done.send(true);
    };
    tokio::join!(refresh, app.ship_logs_every(LOG_FLUSH_INTERVAL, done_rx));
    println!();
    println!("Stopped watching.");
    Ok(())
}

pub(crate) fn refreshed_line(secs: u64) -> String {
    format!(
        "{}",
        console::style(format!(
            "Refreshed {} · every {}s · Ctrl-C to stop",
            timestamp::display(&Utc::now()),
            secs
        ))
        .dim()
    )
}
