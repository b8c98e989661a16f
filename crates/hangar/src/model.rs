//! Core maintenance records for hangar.
//!
//! Aircraft own maintenance sheets, sheets own an ordered checklist of
//! items, and every completion leaves a [`MaintenanceRecord`] behind.
//! Item status is never stored on these types; it is evaluated on read
//! through [`MaintenanceItem::status`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{self, IntervalDays, MaintenanceStatus, StatusPolicy, StatusSummary};

/// An aircraft in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    /// Unique identifier.
    pub id: Uuid,
    /// Registration mark, e.g. `N12345`. Unique across the fleet.
    pub registration: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model designation.
    pub model: String,
    /// Manufacturer serial number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Total airframe hours.
    pub total_hours: f64,
    /// When the last inspection took place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_inspection: Option<DateTime<Utc>>,
    /// When the next inspection is scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_inspection: Option<DateTime<Utc>>,
    /// When this aircraft was registered.
    pub created_at: DateTime<Utc>,
}

impl Aircraft {
    /// Create an aircraft with a fresh identifier and no inspection history.
    #[must_use]
    pub fn new(
        registration: impl Into<String>,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            registration: registration.into(),
            manufacturer: manufacturer.into(),
            model: model.into(),
            serial_number: None,
            total_hours: 0.0,
            last_inspection: None,
            next_inspection: None,
            created_at,
        }
    }

    /// `Manufacturer Model`, as shown next to the registration.
    #[must_use]
    pub fn type_designation(&self) -> String {
        format!("{} {}", self.manufacturer, self.model)
    }
}

/// One recurring task on a maintenance sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceItem {
    /// Unique identifier.
    pub id: Uuid,
    /// What has to be done.
    pub description: String,
    /// Recurrence period.
    pub interval: IntervalDays,
    /// When the task was last performed, if ever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MaintenanceItem {
    /// Create a new item with a fresh identifier.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        interval: IntervalDays,
        last_completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            interval,
            last_completed_at,
            notes: None,
        }
    }

    /// When the task next falls due, or `None` if it was never performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the next-due date is out of range.
    pub fn next_due_at(&self) -> status::Result<Option<DateTime<Utc>>> {
        status::next_due_at(self.interval, self.last_completed_at)
    }

    /// Evaluate the item's status at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the next-due date is out of range.
    pub fn status(
        &self,
        policy: &StatusPolicy,
        now: DateTime<Utc>,
    ) -> status::Result<MaintenanceStatus> {
        policy.evaluate_interval(now, self.interval, self.last_completed_at)
    }

    /// Mark the task as performed at `at`.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.last_completed_at = Some(at);
    }
}

/// A checklist of maintenance items for one aircraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceSheet {
    /// Unique identifier.
    pub id: Uuid,
    /// The aircraft this sheet belongs to.
    pub aircraft_id: Uuid,
    /// Sheet title, e.g. `100-Hour Inspection Checklist`.
    pub title: String,
    /// When the sheet was created.
    pub created_at: DateTime<Utc>,
    /// Bumped whenever an item is added, completed or removed.
    pub updated_at: DateTime<Utc>,
    /// Items in checklist order. Owned exclusively by this sheet.
    pub items: Vec<MaintenanceItem>,
}

impl MaintenanceSheet {
    /// Create an empty sheet.
    #[must_use]
    pub fn new(aircraft_id: Uuid, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            aircraft_id,
            title: title.into(),
            created_at,
            updated_at: created_at,
            items: Vec::new(),
        }
    }

    /// Record a mutation at `at`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Find an item by id, mutably.
    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut MaintenanceItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    /// Remove an item, returning it if it was present.
    pub fn remove_item(&mut self, item_id: Uuid) -> Option<MaintenanceItem> {
        let index = self.items.iter().position(|item| item.id == item_id)?;
        Some(self.items.remove(index))
    }

    /// Summarize the status of every item at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if any item's next-due date is out of range.
    pub fn summary(
        &self,
        policy: &StatusPolicy,
        now: DateTime<Utc>,
    ) -> status::Result<StatusSummary> {
        self.items
            .iter()
            .map(|item| item.status(policy, now))
            .collect()
    }
}

/// History entry written each time an item is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// The aircraft the work was done on.
    pub aircraft_id: Uuid,
    /// The item that was completed. The item itself may since have been deleted.
    pub maintenance_item_id: Uuid,
    /// Item description at the time of completion.
    pub description: String,
    /// When the work was done.
    pub completed_at: DateTime<Utc>,
    /// Airframe hours at completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_at_completion: Option<f64>,
    /// Who signed off the work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    /// Free-form notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the item falls due again.
    pub next_due_at: DateTime<Utc>,
}
