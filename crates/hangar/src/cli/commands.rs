//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

/// Interval used by `item add` when none is given.
pub const DEFAULT_INTERVAL_DAYS: i64 = 100;

/// Number of history records shown by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Parse a date argument: RFC 3339 or `YYYY-MM-DD`.
fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    crate::status::parse_timestamp(value).map_err(|e| e.to_string())
}

/// Aircraft management commands.
#[derive(Debug, Subcommand)]
pub enum AircraftCommand {
    /// Register an aircraft
    Add {
        /// Registration mark, e.g. N12345
        registration: String,

        /// Manufacturer name
        #[arg(short, long)]
        manufacturer: String,

        /// Model designation
        #[arg(short = 'M', long)]
        model: String,

        /// Manufacturer serial number
        #[arg(short, long)]
        serial: Option<String>,

        /// Total airframe hours
        #[arg(long)]
        hours: Option<f64>,

        /// Date of the last inspection
        #[arg(long, value_parser = parse_date)]
        last_inspection: Option<DateTime<Utc>>,

        /// Date of the next scheduled inspection
        #[arg(long, value_parser = parse_date)]
        next_inspection: Option<DateTime<Utc>>,
    },

    /// List the fleet
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show an aircraft with its inspection outlook and sheets
    Show {
        /// Aircraft ID
        id: Uuid,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Update hours, serial number or inspection dates
    Update {
        /// Aircraft ID
        id: Uuid,

        /// Manufacturer serial number
        #[arg(short, long)]
        serial: Option<String>,

        /// Total airframe hours
        #[arg(long)]
        hours: Option<f64>,

        /// Date of the last inspection
        #[arg(long, value_parser = parse_date)]
        last_inspection: Option<DateTime<Utc>>,

        /// Date of the next scheduled inspection
        #[arg(long, value_parser = parse_date)]
        next_inspection: Option<DateTime<Utc>>,
    },

    /// Delete an aircraft with its sheets and history
    Delete {
        /// Aircraft ID
        id: Uuid,
    },
}

/// Maintenance sheet commands.
#[derive(Debug, Subcommand)]
pub enum SheetCommand {
    /// Create an empty sheet for an aircraft
    Create {
        /// Owning aircraft ID
        #[arg(short, long)]
        aircraft: Uuid,

        /// Sheet title, e.g. "100-Hour Inspection"
        title: String,
    },

    /// List sheets
    List {
        /// Only sheets for this aircraft
        #[arg(short, long)]
        aircraft: Option<Uuid>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a sheet with the status of every item
    Show {
        /// Sheet ID
        id: Uuid,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete a sheet and its items
    Delete {
        /// Sheet ID
        id: Uuid,
    },
}

/// Maintenance item commands.
#[derive(Debug, Subcommand)]
pub enum ItemCommand {
    /// Add an item to a sheet
    Add {
        /// Sheet ID
        #[arg(short, long)]
        sheet: Uuid,

        /// What has to be done
        description: String,

        /// Recurrence interval in days
        #[arg(short, long, default_value_t = DEFAULT_INTERVAL_DAYS, allow_negative_numbers = true)]
        interval: i64,

        /// When the task was last performed
        #[arg(long, value_parser = parse_date)]
        last_completed: Option<DateTime<Utc>>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Mark an item as performed now
    Complete {
        /// Item ID
        id: Uuid,

        /// Who did the work
        #[arg(short, long)]
        technician: Option<String>,

        /// Airframe hours at completion (defaults to the aircraft's hours)
        #[arg(long)]
        hours: Option<f64>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Remove an item from its sheet
    Delete {
        /// Item ID
        id: Uuid,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only this aircraft
    #[arg(short, long)]
    pub aircraft: Option<Uuid>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Aircraft ID
    #[arg(short, long)]
    pub aircraft: Uuid,

    /// Maximum number of records
    #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Vendor commands.
#[derive(Debug, Subcommand)]
pub enum VendorCommand {
    /// Add a vendor
    Add {
        /// Vendor name
        name: String,

        /// Contact email address
        #[arg(short, long)]
        email: Option<String>,

        /// Contact phone number
        #[arg(short, long)]
        phone: Option<String>,
    },

    /// List vendors
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Parts catalog commands.
#[derive(Debug, Subcommand)]
pub enum PartCommand {
    /// Add a part to the catalog
    Add {
        /// Part number
        part_number: String,

        /// Display name
        name: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Unit price
        #[arg(short, long)]
        price: Option<f64>,

        /// Link to a product photo
        #[arg(long)]
        image_url: Option<String>,

        /// Category, e.g. "Bearings"
        #[arg(long)]
        category: Option<String>,

        /// Supplying vendor ID
        #[arg(long)]
        vendor: Option<Uuid>,
    },

    /// List the most recently added parts
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Search parts by part number or name
    Search {
        /// Text to look for, ignoring case
        query: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
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
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
