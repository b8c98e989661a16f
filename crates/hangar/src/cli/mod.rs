//! Command-line interface for hangar.
//!
//! This module provides the CLI structure for the `hangar` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AircraftCommand, ConfigCommand, HistoryCommand, ItemCommand, OutputFormat, PartCommand,
    SheetCommand, StatusCommand, VendorCommand, DEFAULT_HISTORY_LIMIT, DEFAULT_INTERVAL_DAYS,
};

/// hangar - Aircraft maintenance tracking
///
/// Keeps maintenance sheets for a fleet of aircraft, shows which items are
/// current, due or overdue, and maintains a parts catalog.
#[derive(Debug, Parser)]
#[command(name = "hangar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
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
    /// Manage the fleet
    #[command(subcommand)]
    Aircraft(AircraftCommand),

    /// Manage maintenance sheets
    #[command(subcommand)]
    Sheet(SheetCommand),

    /// Manage items on a maintenance sheet
    #[command(subcommand)]
    Item(ItemCommand),

    /// Show maintenance status for the fleet or one aircraft
    Status(StatusCommand),

    /// Show completed maintenance for an aircraft
    History(HistoryCommand),

    /// Manage parts vendors
    #[command(subcommand)]
    Vendor(VendorCommand),

    /// Manage the parts catalog
    #[command(subcommand)]
    Part(PartCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
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
