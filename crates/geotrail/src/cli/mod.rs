//! Command-line interface for geotrail.
//!
//! This module provides the CLI structure for the `geotrail` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, CaptureCommand, ClearCommand, ConfigCommand, DeleteAtCommand, DeleteCommand,
    ListCommand, StatusCommand,
};

/// geotrail - Record and upload where you have been
///
/// Captures location fixes into a local journal, mirrors them to a shared
/// file, and uploads them to a collection endpoint.
#[derive(Debug, Parser)]
#[command(name = "geotrail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record the current location
    Capture(CaptureCommand),

    /// Record a location given by hand
    Add(AddCommand),

    /// List recorded locations
    List(ListCommand),

    /// Delete a location by id
    Delete(DeleteCommand),

    /// Delete a location by position
    DeleteAt(DeleteAtCommand),

    /// Delete all locations
    Clear(ClearCommand),

    /// Upload all locations and remove them on success
    Upload,

    /// Write the shared export file
    Export,

    /// Replace the journal with the shared export file
    Import,

    /// Write the shared export file and read it back
    Sync,

    /// Show storage and provider status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Whether the command needs the loaded configuration.
    ///
    /// `config path` and `config validate` run before loading so they still
    /// work when the active configuration is invalid.
    #[must_use]
    pub fn needs_config(&self) -> bool {
        !matches!(
            self,
            Self::Config(ConfigCommand::Path | ConfigCommand::Validate { .. })
        )
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
