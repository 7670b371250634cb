use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use floortrack::app::App;
use floortrack::common::JobStatus;
use floortrack::common::filter::{JobTag, StatusFilter};
use floortrack::config::Config;
use floortrack::errors::ApiError;
use floortrack::logging::{RemoteLogs, init_logging};
use floortrack::services::logs::LogChannel;
use floortrack::view::{RangePreset, Theme};

mod cmd;

#[derive(Parser)]
#[command(name = "floortrack")]
#[command(version, about = "Track jobs as they move between factory stations")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to floortrack.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL. Overrides floortrack.toml and FLOORTRACK_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Remove the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List, inspect, move and export jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Manage stations and watch what is on them
    Stations {
        #[command(subcommand)]
        command: StationsCommands,
    },
    /// Manage customers
    Customers {
        #[command(subcommand)]
        command: CustomersCommands,
    },
    /// Manage users
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Station stays of selected jobs over a date range
    Timeline {
        #[command(subcommand)]
        command: TimelineCommands,
    },
    /// Factory floor: station layout and job paths
    Factory {
        #[command(subcommand)]
        command: FactoryCommands,
    },
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommands>,
    },
    /// Handle a scanned job QR code
    Scan {
        /// Decoded QR text, e.g. '{"job": 42}'
        payload: String,

        /// Move the job to this station
        #[arg(long, conflicts_with = "complete")]
        move_to: Option<i64>,

        /// Mark the job complete
        #[arg(long)]
        complete: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct JobFilterArgs {
    /// Match name, description or customer name
    #[arg(short, long)]
    pub search: Option<String>,

    /// all, active, complete or overdue
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
}

#[derive(Subcommand, Clone)]
pub enum JobsCommands {
    /// List jobs with their current station
    List {
        #[command(flatten)]
        filter: JobFilterArgs,
    },
    /// Show one job with its location history
    Show { id: i64 },
    /// Create a job
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// Move a job to a station
    Move { id: i64, station: i64 },
    /// Set a job's status
    Status { id: i64, status: JobStatus },
    /// Mark a job complete
    Complete { id: i64 },
    /// Show a job's location history
    History { id: i64 },
    /// Export jobs with their location history as CSV
    Export {
        #[command(flatten)]
        filter: JobFilterArgs,
        /// Output file (defaults to jobs_export_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Refresh the job list periodically
    Watch {
        #[command(flatten)]
        filter: JobFilterArgs,
    },
}

#[derive(Subcommand, Clone)]
pub enum StationsCommands {
    /// List stations
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show a station and the jobs on it
    Show { id: i64 },
    /// Create a station
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        manufacturer: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a station
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Every station with the jobs currently on it
    Tracker {
        #[arg(short, long)]
        search: Option<String>,
        /// Hide stations without jobs
        #[arg(long)]
        with_jobs: bool,
        /// Keep refreshing
        #[arg(long)]
        watch: bool,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct CustomerArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub address: String,
}

#[derive(Subcommand, Clone)]
pub enum CustomersCommands {
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    Create {
        #[command(flatten)]
        customer: CustomerArgs,
    },
    Update {
        id: i64,
        #[command(flatten)]
        customer: CustomerArgs,
    },
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Jobs ordered by a customer
    Jobs {
        id: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum UsersCommands {
    List {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Register a new user (prompts for the password)
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum TimelineCommands {
    /// Stays of the selected jobs within the saved date range
    Show {
        /// Only jobs carrying one of these tags
        #[arg(long, value_delimiter = ',')]
        tag: Vec<JobTag>,
    },
    /// List jobs with tag counts, marking the selected ones
    Jobs {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tag: Vec<JobTag>,
    },
    /// Replace the selection
    Select { ids: Vec<i64> },
    /// Add or remove one job from the selection
    Toggle { id: i64 },
    /// Set the date range (YYYY-MM-DD or RFC 3339)
    Range {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Back to the last two weeks
        #[arg(long, conflicts_with_all = ["start", "end"])]
        reset: bool,
        /// Whole days up to today: week, 2weeks or month
        #[arg(long, conflicts_with_all = ["start", "end", "reset"])]
        preset: Option<RangePreset>,
    },
    /// Refresh the timeline periodically
    Watch {
        #[arg(long, value_delimiter = ',')]
        tag: Vec<JobTag>,
    },
}

#[derive(Subcommand, Clone)]
pub enum FactoryCommands {
    /// Stations with their saved positions and current jobs
    Show {
        #[arg(long, value_delimiter = ',')]
        tag: Vec<JobTag>,
    },
    /// Paths of one step of a job's route across the floor
    Route {
        job: i64,
        /// History step (0 = arrival)
        #[arg(long)]
        step: Option<usize>,
    },
    /// Follow a job's route, refreshing its history
    Live { job: i64 },
    /// Place a station on the canvas
    MoveStation {
        station: i64,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        /// Also store the position on the backend
        #[arg(long)]
        sync: bool,
    },
    /// Arrange stations in the default grid and reset zoom
    Layout {
        /// Station ids to lay out instead of fetching the station list
        #[arg(long, value_delimiter = ',')]
        stations: Vec<i64>,
    },
    /// Zoom: `in`, `out`, `reset` or a scale between 0.1 and 2
    Zoom { level: String },
    /// Set the pan offset
    Pan {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
}

#[derive(Subcommand, Clone)]
pub enum ThemeCommands {
    Show,
    Toggle,
    Set { theme: Theme },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default floortrack.toml file
    Init,
}

impl Commands {
    fn log_channel(&self) -> LogChannel {
        match self {
            Commands::Scan { .. } => LogChannel::Scanner,
            _ => LogChannel::Frontend,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref(), cli.api_url.as_deref())?;

    let remote_logs = config
        .toml
        .logging
        .ship_remote
        .then(|| RemoteLogs::new(cli.command.log_channel()));
    let _guard = init_logging(&config.logging(), cli.verbose, remote_logs.as_ref())?;

    let app = App::new(config, remote_logs)?;
    let result = run(&cli, &app).await;
    if let Err(e) = &result
        && e
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::requires_sign_in)
    {
        eprintln!("{}", cmd::SIGN_IN_HINT);
    }
    app.flush_logs().await;
    result
}

async fn run(cli: &Cli, app: &App) -> Result<()> {
    match &cli.command {
        Commands::Login { username } => cmd::cmd_login(app, username.as_deref()).await?,
        Commands::Logout => cmd::cmd_logout(app)?,
        Commands::Whoami => cmd::cmd_whoami(app).await?,
        Commands::Jobs { command } => cmd::cmd_jobs(app, command.clone()).await?,
        Commands::Stations { command } => cmd::cmd_stations(app, command.clone()).await?,
        Commands::Customers { command } => cmd::cmd_customers(app, command.clone()).await?,
        Commands::Users { command } => cmd::cmd_users(app, command.clone()).await?,
        Commands::Timeline { command } => cmd::cmd_timeline(app, command.clone()).await?,
        Commands::Factory { command } => cmd::cmd_factory(app, command.clone()).await?,
        Commands::Theme { command } => cmd::cmd_theme(app, command.clone())?,
        Commands::Scan {
            payload,
            move_to,
            complete,
        } => cmd::cmd_scan(app, payload, *move_to, *complete).await?,
        Commands::Config { command } => cmd::cmd_config(&app.config, command.clone())?,
    }
    Ok(())
}
