//! `hangar` - Aircraft maintenance tracking and parts catalog
//!
//! This library provides the maintenance status evaluator, the fleet and
//! catalog services built on it, and their `SQLite` storage. Status is always
//! derived from an item's interval and last completion, never stored.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
mod input;
pub mod logging;
pub mod model;
pub mod status;
pub mod storage;
pub mod tracker;

pub use catalog::{Catalog, Product, Vendor};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Aircraft, MaintenanceItem, MaintenanceRecord, MaintenanceSheet};
pub use status::{
    evaluate_status, IntervalDays, MaintenanceStatus, StatusPolicy, StatusSummary,
    ValidationError,
};
pub use storage::{Storage, StorageStats};
pub use tracker::Tracker;
