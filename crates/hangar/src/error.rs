//! Error types for hangar.
//!
//! This module defines the crate-wide error type. Evaluator input errors
//! live in [`crate::status::ValidationError`] and are wrapped here.

use std::path::PathBuf;
use thiserror::Error;

use crate::status::ValidationError;

/// The main error type for hangar operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    /// Evaluator input was invalid.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A field failed validation before reaching storage.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// The kind of record, e.g. `aircraft`.
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// An aircraft with this registration already exists.
    #[error("aircraft with registration '{registration}' already exists")]
    DuplicateRegistration {
        /// The conflicting registration.
        registration: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for hangar operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Check if this error is a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error was caused by bad caller input rather than the
    /// environment.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidInput { .. } | Self::DuplicateRegistration { .. }
        )
    }
}
