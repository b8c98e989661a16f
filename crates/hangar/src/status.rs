//! Maintenance status evaluation.
//!
//! Classifies a recurring maintenance item as current, due, or overdue from
//! its interval and last completion time, and folds a collection of
//! classifications into a single worst-case summary.
//!
//! Everything here is pure: no I/O, no shared state. The same inputs always
//! produce the same outputs.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use hangar::status::{evaluate_status, MaintenanceStatus};
//!
//! let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
//! let last = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
//!
//! assert_eq!(evaluate_status(now, 100, Some(last)).unwrap(), MaintenanceStatus::Due);
//! assert_eq!(evaluate_status(now, 100, None).unwrap(), MaintenanceStatus::Due);
//! assert!(evaluate_status(now, 0, Some(last)).is_err());
//! ```

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of days ahead of the next-due date at which an item is `due`.
pub const DEFAULT_DUE_WINDOW_DAYS: i64 = 30;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Earliest year a stored timestamp may carry.
pub const MIN_YEAR: i32 = 1;

/// Latest year a stored timestamp may carry.
///
/// RFC 3339 text has a four-digit year, so anything later cannot be read back.
pub const MAX_YEAR: i32 = 9999;

/// Invalid input to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The recurrence interval was zero or negative.
    #[error("interval must be a positive number of days, got {0}")]
    NonPositiveInterval(i64),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp '{input}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidTimestamp {
        /// The rejected input.
        input: String,
    },

    /// Adding the interval to the last completion left the representable range.
    #[error("next due date out of range: {last_completed} + {interval_days} days")]
    DueDateOutOfRange {
        /// When the item was last completed.
        last_completed: DateTime<Utc>,
        /// The interval that was added.
        interval_days: i64,
    },

    /// The due window was negative or too large to represent.
    #[error("due window must be a non-negative number of days, got {0}")]
    InvalidDueWindow(i64),

    /// A timestamp fell outside years 1 through 9999.
    #[error("timestamp {at} is outside years 1 through 9999")]
    TimestampOutOfRange {
        /// The rejected instant.
        at: DateTime<Utc>,
    },
}

/// Result type for evaluator operations.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Classification of a maintenance item.
///
/// Variants are ordered by severity, so `max()` over a collection yields the
/// dominant status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    /// Next due date is further out than the due window.
    Current,
    /// Never serviced, or next due date falls within the due window.
    Due,
    /// Next due date has passed.
    Overdue,
}

impl MaintenanceStatus {
    /// All statuses, least severe first.
    pub const ALL: [Self; 3] = [Self::Current, Self::Due, Self::Overdue];

    /// The lowercase label used for display and persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Due => "due",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated recurrence interval, in whole days. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct IntervalDays(i64);

impl IntervalDays {
    /// Validate a raw day count.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveInterval`] if `days <= 0`.
    pub fn new(days: i64) -> Result<Self> {
        if days <= 0 {
            return Err(ValidationError::NonPositiveInterval(days));
        }
        Ok(Self(days))
    }

    /// The number of days.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for IntervalDays {
    type Error = ValidationError;

    fn try_from(days: i64) -> Result<Self> {
        Self::new(days)
    }
}

impl From<IntervalDays> for i64 {
    fn from(interval: IntervalDays) -> Self {
        interval.0
    }
}

impl fmt::Display for IntervalDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Check that `at` can be written as RFC 3339 text and read back.
///
/// # Errors
///
/// Returns [`ValidationError::TimestampOutOfRange`] outside
/// [`MIN_YEAR`]..=[`MAX_YEAR`].
pub fn ensure_storable(at: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if (MIN_YEAR..=MAX_YEAR).contains(&at.year()) {
        Ok(at)
    } else {
        Err(ValidationError::TimestampOutOfRange { at })
    }
}

/// Parse a timestamp given either as RFC 3339 or as a bare `YYYY-MM-DD` date.
///
/// Bare dates are taken as midnight UTC.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimestamp`] if neither form matches and
/// [`ValidationError::TimestampOutOfRange`] for years outside
/// [`MIN_YEAR`]..=[`MAX_YEAR`].
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let parsed = match DateTime::parse_from_rfc3339(trimmed) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc()),
    };
    let at = parsed.ok_or_else(|| ValidationError::InvalidTimestamp {
        input: input.to_string(),
    })?;
    ensure_storable(at)
}

/// Compute `last_completed + interval`, or `None` if never completed.
///
/// # Errors
///
/// Returns [`ValidationError::DueDateOutOfRange`] if the sum is not
/// representable or lands after [`MAX_YEAR`].
pub fn next_due_at(
    interval: IntervalDays,
    last_completed: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>> {
    let Some(last) = last_completed else {
        return Ok(None);
    };
    Duration::try_days(interval.get())
        .and_then(|span| last.checked_add_signed(span))
        .filter(|due| ensure_storable(*due).is_ok())
        .map(Some)
        .ok_or(ValidationError::DueDateOutOfRange {
            last_completed: last,
            interval_days: interval.get(),
        })
}

/// Evaluate an item with the default 30-day due window.
///
/// # Errors
///
/// Returns a [`ValidationError`] if `interval_days <= 0` or the next-due date
/// is out of range.
pub fn evaluate_status(
    now: DateTime<Utc>,
    interval_days: i64,
    last_completed: Option<DateTime<Utc>>,
) -> Result<MaintenanceStatus> {
    StatusPolicy::default().evaluate(now, interval_days, last_completed)
}

/// Fold statuses into a [`StatusSummary`].
pub fn summarize<I>(statuses: I) -> StatusSummary
where
    I: IntoIterator<Item = MaintenanceStatus>,
{
    statuses.into_iter().collect()
}

/// Classification rules with a configurable due window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    due_window: Duration,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            due_window: Duration::days(DEFAULT_DUE_WINDOW_DAYS),
        }
    }
}

impl StatusPolicy {
    /// Build a policy with a custom due window.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDueWindow`] if `days` is negative or
    /// too large to represent.
    pub fn with_due_window_days(days: i64) -> Result<Self> {
        if days < 0 {
            return Err(ValidationError::InvalidDueWindow(days));
        }
        let due_window = Duration::try_days(days).ok_or(ValidationError::InvalidDueWindow(days))?;
        Ok(Self { due_window })
    }

    /// The due window in whole days.
    #[must_use]
    pub fn due_window_days(&self) -> i64 {
        self.due_window.num_days()
    }

    /// Classify an item from a raw interval.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `interval_days <= 0` or the next-due
    /// date is out of range.
    pub fn evaluate(
        &self,
        now: DateTime<Utc>,
        interval_days: i64,
        last_completed: Option<DateTime<Utc>>,
    ) -> Result<MaintenanceStatus> {
        let interval = IntervalDays::new(interval_days)?;
        self.evaluate_interval(now, interval, last_completed)
    }

    /// Classify an item from an already-validated interval.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DueDateOutOfRange`] if the next-due date
    /// cannot be represented.
    pub fn evaluate_interval(
        &self,
        now: DateTime<Utc>,
        interval: IntervalDays,
        last_completed: Option<DateTime<Utc>>,
    ) -> Result<MaintenanceStatus> {
        // Never serviced: due, not overdue.
        let Some(next_due) = next_due_at(interval, last_completed)? else {
            return Ok(MaintenanceStatus::Due);
        };

        if next_due < now {
            Ok(MaintenanceStatus::Overdue)
        } else if next_due - now <= self.due_window {
            Ok(MaintenanceStatus::Due)
        } else {
            Ok(MaintenanceStatus::Current)
        }
    }

    /// Outlook for an aircraft's next scheduled inspection.
    ///
    /// Returns `None` when no inspection is scheduled.
    #[must_use]
    pub fn inspection_outlook(
        &self,
        now: DateTime<Utc>,
        next_inspection: Option<DateTime<Utc>>,
    ) -> Option<InspectionOutlook> {
        let next_inspection = next_inspection?;
        let millis = (next_inspection - now).num_milliseconds();
        let mut days_remaining = millis.div_euclid(MILLIS_PER_DAY);
        if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
            days_remaining += 1;
        }

        let status = if days_remaining < 0 {
            MaintenanceStatus::Overdue
        } else if days_remaining < self.due_window_days() {
            MaintenanceStatus::Due
        } else {
            MaintenanceStatus::Current
        };

        Some(InspectionOutlook {
            next_inspection,
            days_remaining,
            status,
        })
    }
}

/// Days until (or since) an aircraft's next inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InspectionOutlook {
    /// The scheduled inspection time.
    pub next_inspection: DateTime<Utc>,
    /// Whole days remaining, rounded up. Negative once the date has passed.
    pub days_remaining: i64,
    /// Classification of the outlook.
    pub status: MaintenanceStatus,
}

impl fmt::Display for InspectionOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days_remaining < 0 {
            write!(f, "Overdue by {} days", self.days_remaining.unsigned_abs())
        } else {
            write!(f, "Due in {} days", self.days_remaining)
        }
    }
}

/// Per-status counts over a collection, plus the dominant status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    /// Items that are current.
    pub current: usize,
    /// Items that are due.
    pub due: usize,
    /// Items that are overdue.
    pub overdue: usize,
}

impl StatusSummary {
    /// Count one more item with the given status.
    pub fn record(&mut self, status: MaintenanceStatus) {
        match status {
            MaintenanceStatus::Current => self.current += 1,
            MaintenanceStatus::Due => self.due += 1,
            MaintenanceStatus::Overdue => self.overdue += 1,
        }
    }

    /// Add another summary's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.current += other.current;
        self.due += other.due;
        self.overdue += other.overdue;
    }

    /// Total number of items counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.current + self.due + self.overdue
    }

    /// Count for a single status.
    #[must_use]
    pub fn count(&self, status: MaintenanceStatus) -> usize {
        match status {
            MaintenanceStatus::Current => self.current,
            MaintenanceStatus::Due => self.due,
            MaintenanceStatus::Overdue => self.overdue,
        }
    }

    /// Worst-case status: overdue, then due, then current.
    ///
    /// An empty summary is `Current`.
    #[must_use]
    pub fn dominant(&self) -> MaintenanceStatus {
        if self.overdue > 0 {
            MaintenanceStatus::Overdue
        } else if self.due > 0 {
            MaintenanceStatus::Due
        } else {
            MaintenanceStatus::Current
        }
    }

    /// Short badge text such as `2 Overdue`, `1 Due` or `Current`.
    #[must_use]
    pub fn headline(&self) -> String {
        match self.dominant() {
            MaintenanceStatus::Overdue => format!("{} Overdue", self.overdue),
            MaintenanceStatus::Due => format!("{} Due", self.due),
            MaintenanceStatus::Current => "Current".to_string(),
        }
    }
}

impl FromIterator<MaintenanceStatus> for StatusSummary {
    fn from_iter<I: IntoIterator<Item = MaintenanceStatus>>(iter: I) -> Self {
        let mut summary = Self::default();
        summary.extend(iter);
        summary
    }
}

impl Extend<MaintenanceStatus> for StatusSummary {
    fn extend<I: IntoIterator<Item = MaintenanceStatus>>(&mut self, iter: I) {
        for status in iter {
            self.record(status);
        }
    }
}
