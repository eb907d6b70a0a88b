//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Capture command arguments.
#[derive(Debug, Args)]
pub struct CaptureCommand {
    /// Address or note to store with the fix
    #[arg(short, long)]
    pub address: Option<String>,
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Latitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    pub longitude: f64,

    /// Address or note to store with the location
    #[arg(short, long)]
    pub address: Option<String>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Id of the record to delete
    pub id: crate::record::RecordId,
}

/// Delete-at command arguments.
#[derive(Debug, Args)]
pub struct DeleteAtCommand {
    /// Zero-based position of the record to delete
    pub index: usize,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_command_debug() {
        let cmd = StatusCommand { json: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("json: true"));
    }

    #[test]
    fn test_config_command_variants() {
        let show = ConfigCommand::Show { json: false };
        assert!(matches!(show, ConfigCommand::Show { json: false }));

        let validate = ConfigCommand::Validate { file: None };
        assert!(matches!(validate, ConfigCommand::Validate { file: None }));
    }
}
