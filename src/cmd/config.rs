//! Configuration view and validation commands for `floortrack config`.

use anyhow::Result;

use floortrack::config::{Config, FloortrackToml};
use floortrack::ui::icons;

use super::super::ConfigCommands;

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.path;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Floortrack Configuration");
            println!("========================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No floortrack.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
            }
            println!();
            print_toml(&config.toml);

            // Show effective values (including env overrides)
            println!("Effective values (with env/CLI overrides):");
            println!("  base_url = \"{}\"", config.base_url);
            println!("  data_dir = \"{}\"", config.data_dir.display());
            println!("  log_level = \"{}\"", config.log_level);
            if let Some(log_dir) = &config.logging().log_dir {
                println!("  log_dir = \"{}\"", log_dir.display());
            }
            println!();

            if !config_path.exists() {
                println!("Run 'floortrack config init' to create a floortrack.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No floortrack.toml found. Using defaults.");
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("{}Configuration warnings:", icons::WARN);
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("floortrack.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            FloortrackToml::default().save(config_path)?;

            println!("Created floortrack.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, timeout_secs");
            println!("  - [storage] data_dir");
            println!("  - [logging] level, log_dir, ship_remote");
            println!("  - [polling] jobs_secs, stations_secs, timeline_secs, factory_secs");
            println!();
        }
    }

    Ok(())
}

fn print_toml(toml: &FloortrackToml) {
    println!("[api]");
    println!("  base_url = \"{}\"", toml.api.base_url);
    println!("  timeout_secs = {}", toml.api.timeout_secs);
    println!();

    if let Some(dir) = &toml.storage.data_dir {
        println!("[storage]");
        println!("  data_dir = \"{}\"", dir.display());
        println!();
    }

    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    if let Some(dir) = &toml.logging.log_dir {
        println!("  log_dir = \"{}\"", dir.display());
    }
    println!("  ship_remote = {}", toml.logging.ship_remote);
    println!();

    println!("[polling]");
    println!("  jobs_secs = {}", toml.polling.jobs_secs);
    println!("  stations_secs = {}", toml.polling.stations_secs);
    println!("  timeline_secs = {}", toml.polling.timeline_secs);
    println!("  factory_secs = {}", toml.polling.factory_secs);
    println!();
}
