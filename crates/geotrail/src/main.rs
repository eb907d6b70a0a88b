//! `geotrail` - CLI for the location journal
//!
//! This binary records location fixes, manages the stored journal, and uploads
//! it to the configured endpoint.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use geotrail::cli::{Cli, ClearCommand, Command, ConfigCommand, ListCommand, StatusCommand};
use geotrail::{init_logging, platform, Config, Controller, LocationRecord};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if !cli.command.needs_config() {
        if let Command::Config(config_cmd) = cli.command {
            return handle_config(None, config_cmd, cli.config);
        }
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;
    platform::init()?;
    debug!("Running on {}", platform::platform_name());

    if let Command::Config(config_cmd) = cli.command {
        return handle_config(Some(&config), config_cmd, cli.config);
    }

    let mut controller = Controller::from_config(&config)?;

    // Execute the command
    match cli.command {
        Command::Capture(cmd) => {
            controller.ensure_storage_access();
            let record = controller.capture(cmd.address).await?;
            print_recorded(&record);
        }
        Command::Add(cmd) => {
            let record = controller.record_manual(cmd.latitude, cmd.longitude, cmd.address)?;
            print_recorded(&record);
        }
        Command::List(cmd) => handle_list(&controller, &cmd)?,
        Command::Delete(cmd) => match controller.delete(cmd.id)? {
            Some(record) => println!("Deleted {}", record.id),
            None => println!("No location with id {}", cmd.id),
        },
        Command::DeleteAt(cmd) => {
            let record = controller.delete_at(cmd.index)?;
            println!("Deleted {} at position {}", record.id, cmd.index);
        }
        Command::Clear(cmd) => handle_clear(&mut controller, &cmd)?,
        Command::Upload => {
            let receipt = controller.upload_all().await?;
            println!(
                "Uploaded {} locations (status {})",
                receipt.record_count, receipt.status
            );
        }
        Command::Export => {
            controller.ensure_storage_access();
            controller.export()?;
            println!("Exported {} locations", controller.records().len());
        }
        Command::Import => {
            controller.ensure_storage_access();
            if controller.import_shared()? {
                println!("Imported {} locations", controller.records().len());
            } else {
                println!("No shared export to import");
            }
        }
        Command::Sync => {
            controller.ensure_storage_access();
            if controller.sync_shared()? {
                println!("Synced {} locations", controller.records().len());
            } else {
                println!("Shared export is disabled");
            }
        }
        Command::Status(cmd) => handle_status(&config, &controller, &cmd).await?,
        Command::Config(_) => {}
    }
    Ok(())
}

fn print_recorded(record: &LocationRecord) {
    println!(
        "Recorded {} at {}, {}",
        record.id, record.latitude, record.longitude
    );
}

fn handle_list(controller: &Controller, cmd: &ListCommand) -> Result<(), Box<dyn std::error::Error>> {
    let records = controller.records();
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No locations recorded.");
        return Ok(());
    }
    for (index, record) in records.iter().enumerate() {
        let recorded_at = record
            .recorded_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{index:>4}  {}  {:>11.6} {:>11.6}  {recorded_at}  {}",
            record.id,
            record.latitude,
            record.longitude,
            record.address.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn handle_clear(
    controller: &mut Controller,
    cmd: &ClearCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    if !cmd.yes {
        println!(
            "This will delete all {} recorded locations.",
            controller.records().len()
        );
        println!("Use --yes to confirm.");
        return Ok(());
    }
    controller.clear()?;
    println!("All locations deleted.");
    Ok(())
}

async fn handle_status(
    config: &Config,
    controller: &Controller,
    cmd: &StatusCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = controller.store();
    let authorization = controller.provider().authorization_status().await;
    let storage_access = controller.shared_dir().map(platform::check_storage_access);

    if cmd.json {
        let status = serde_json::json!({
            "platform": platform::platform_name(),
            "provider": controller.provider().name(),
            "authorization": authorization.to_string(),
            "private_path": store.private_path(),
            "locations": store.len(),
            "shared_dir": controller.shared_dir(),
            "shared_access": storage_access.as_ref().map(|s| s.is_granted),
            "export_stale": store.export_is_stale(),
            "endpoint": config.upload.endpoint,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("geotrail status");
        println!("---------------");
        println!("Platform:      {}", platform::platform_name());
        println!(
            "Provider:      {} ({})",
            controller.provider().name(),
            authorization
        );
        println!("Private file:  {}", store.private_path().display());
        println!("Locations:     {}", store.len());
        match (controller.shared_dir(), &storage_access) {
            (Some(dir), Some(access)) => {
                println!("Shared dir:    {}", dir.display());
                println!("Shared access: {}", access.description);
            }
            _ => println!("Shared dir:    disabled"),
        }
        println!("Endpoint:      {}", config.upload.endpoint);
    }
    Ok(())
}

fn handle_config(
    config: Option<&Config>,
    cmd: ConfigCommand,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_path = config_path.unwrap_or_else(Config::default_config_path);
    match cmd {
        ConfigCommand::Show { json } => {
            let Some(config) = config else {
                return Err("configuration was not loaded".into());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Private file:       {}", config.private_path().display());
                println!("  Export enabled:     {}", config.storage.export_enabled);
                match config.shared_dir() {
                    Some(dir) => println!("  Shared dir:         {}", dir.display()),
                    None => println!("  Shared dir:         (none)"),
                }
                println!("  Display name:       {}", config.storage.display_name);
                println!("  MIME type:          {}", config.storage.mime_type);
                println!();
                println!("[Location]");
                println!("  Provider:           {}", config.location.provider);
                println!(
                    "  gpsd:               {}:{}",
                    config.location.gpsd_host, config.location.gpsd_port
                );
                println!("  Accuracy:           {}", config.location.desired_accuracy);
                println!("  Max age (ms):       {}", config.location.maximum_age_ms);
                println!("  Timeout (ms):       {}", config.location.timeout_ms);
                println!();
                println!("[Upload]");
                println!("  Endpoint:           {}", config.upload.endpoint);
                println!("  Timeout (s):        {}", config.upload.timeout_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", active_path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or(active_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
