//! Maintenance tracking operations.
//!
//! [`Tracker`] ties the fleet records in [`Storage`] to the status rules in
//! [`StatusPolicy`]. Every read evaluates status against the caller's `now`;
//! nothing here writes a status back to storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::input;
use crate::model::{Aircraft, MaintenanceItem, MaintenanceRecord, MaintenanceSheet};
use crate::status::{
    ensure_storable, InspectionOutlook, IntervalDays, MaintenanceStatus, StatusPolicy,
    StatusSummary,
};
use crate::storage::Storage;

/// Input for [`Tracker::register_aircraft`].
#[derive(Debug, Clone, Default)]
pub struct NewAircraft {
    /// Registration mark. Required and unique, ignoring case.
    pub registration: String,
    /// Manufacturer name. Required.
    pub manufacturer: String,
    /// Model designation. Required.
    pub model: String,
    /// Manufacturer serial number.
    pub serial_number: Option<String>,
    /// Airframe hours; defaults to 0.
    pub total_hours: Option<f64>,
    /// Most recent inspection.
    pub last_inspection: Option<DateTime<Utc>>,
    /// Next scheduled inspection.
    pub next_inspection: Option<DateTime<Utc>>,
}

/// Partial update for [`Tracker::update_aircraft`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct AircraftUpdate {
    /// New serial number.
    pub serial_number: Option<String>,
    /// New airframe hours.
    pub total_hours: Option<f64>,
    /// New last inspection date.
    pub last_inspection: Option<DateTime<Utc>>,
    /// New next inspection date.
    pub next_inspection: Option<DateTime<Utc>>,
}

impl AircraftUpdate {
    fn is_empty(&self) -> bool {
        self.serial_number.is_none()
            && self.total_hours.is_none()
            && self.last_inspection.is_none()
            && self.next_inspection.is_none()
    }
}

/// Input for [`Tracker::add_item`].
#[derive(Debug, Clone)]
pub struct NewItem {
    /// What has to be done. Required.
    pub description: String,
    /// Recurrence period in days; must be positive.
    pub interval_days: i64,
    /// When the task was last performed, if known.
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Sign-off details for [`Tracker::complete_item`].
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Who did the work.
    pub technician: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Airframe hours at completion; defaults to the aircraft's total hours.
    pub hours_at_completion: Option<f64>,
}

/// An item together with its evaluated status.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    /// The stored item.
    #[serde(flatten)]
    pub item: MaintenanceItem,
    /// When the item falls due, if it was ever performed.
    pub next_due_at: Option<DateTime<Utc>>,
    /// Status at the time of the view.
    pub status: MaintenanceStatus,
}

/// A sheet with every item evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct SheetView {
    /// Sheet identifier.
    pub id: Uuid,
    /// Owning aircraft.
    pub aircraft_id: Uuid,
    /// Sheet title.
    pub title: String,
    /// When the sheet was created.
    pub created_at: DateTime<Utc>,
    /// When an item was last added, completed or removed.
    pub updated_at: DateTime<Utc>,
    /// Items in checklist order.
    pub items: Vec<ItemView>,
    /// Aggregate over `items`.
    pub summary: StatusSummary,
}

/// One line per sheet on the aircraft view.
#[derive(Debug, Clone, Serialize)]
pub struct SheetOverview {
    /// Sheet identifier.
    pub id: Uuid,
    /// Sheet title.
    pub title: String,
    /// Number of items on the sheet.
    pub item_count: usize,
    /// When the sheet last changed.
    pub updated_at: DateTime<Utc>,
    /// Aggregate over the sheet's items.
    pub summary: StatusSummary,
}

/// An aircraft with its inspection outlook and per-sheet summaries.
#[derive(Debug, Clone, Serialize)]
pub struct AircraftView {
    /// The stored aircraft.
    pub aircraft: Aircraft,
    /// Next inspection outlook; `None` when not scheduled.
    pub inspection: Option<InspectionOutlook>,
    /// Sheets, oldest first.
    pub sheets: Vec<SheetOverview>,
    /// Aggregate over every item on every sheet.
    pub summary: StatusSummary,
}

/// One row per aircraft on the fleet view.
#[derive(Debug, Clone, Serialize)]
pub struct FleetEntry {
    /// Aircraft identifier.
    pub id: Uuid,
    /// Registration mark.
    pub registration: String,
    /// `Manufacturer Model`.
    pub type_designation: String,
    /// Next inspection outlook.
    pub inspection: Option<InspectionOutlook>,
    /// Aggregate over the aircraft's items.
    pub summary: StatusSummary,
}

/// Status across the whole fleet.
#[derive(Debug, Clone, Serialize)]
pub struct FleetView {
    /// Aircraft ordered by registration.
    pub aircraft: Vec<FleetEntry>,
    /// Aggregate over every item in the fleet.
    pub summary: StatusSummary,
}

/// Maintenance operations over a [`Storage`].
#[derive(Debug)]
pub struct Tracker<'a> {
    storage: &'a Storage,
    policy: StatusPolicy,
}

impl<'a> Tracker<'a> {
    /// Create a tracker that evaluates status with `policy`.
    #[must_use]
    pub fn new(storage: &'a Storage, policy: StatusPolicy) -> Self {
        Self { storage, policy }
    }

    /// The policy used for every evaluation.
    #[must_use]
    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    // === Aircraft ===

    /// Register a new aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is blank, the hours are
    /// negative, the registration is taken, or the database operation fails.
    pub fn register_aircraft(&self, new: NewAircraft, now: DateTime<Utc>) -> Result<Aircraft> {
        let registration = input::required("registration", &new.registration)?;
        if self
            .storage
            .find_aircraft_by_registration(&registration)?
            .is_some()
        {
            return Err(Error::DuplicateRegistration { registration });
        }

        let mut aircraft = Aircraft::new(
            registration,
            input::required("manufacturer", &new.manufacturer)?,
            input::required("model", &new.model)?,
            now,
        );
        aircraft.serial_number = input::optional(new.serial_number);
        if let Some(hours) = new.total_hours {
            aircraft.total_hours = input::non_negative("total_hours", hours)?;
        }
        aircraft.last_inspection = new.last_inspection.map(ensure_storable).transpose()?;
        aircraft.next_inspection = new.next_inspection.map(ensure_storable).transpose()?;

        self.storage.upsert_aircraft(&aircraft)?;
        info!(
            "Registered aircraft {} ({})",
            aircraft.registration, aircraft.id
        );
        Ok(aircraft)
    }

    /// Look up an aircraft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such aircraft.
    pub fn aircraft(&self, id: Uuid) -> Result<Aircraft> {
        self.storage
            .get_aircraft(id)?
            .ok_or_else(|| Error::not_found("aircraft", id))
    }

    /// Every aircraft, ordered by registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn fleet(&self) -> Result<Vec<Aircraft>> {
        self.storage.list_aircraft()
    }

    /// Apply a partial update to an aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if the update is empty, the hours are negative, the
    /// aircraft does not exist, or the database operation fails.
    pub fn update_aircraft(&self, id: Uuid, update: AircraftUpdate) -> Result<Aircraft> {
        if update.is_empty() {
            return Err(Error::invalid_input("update", "no fields to update"));
        }

        let mut aircraft = self.aircraft(id)?;
        if let Some(serial_number) = update.serial_number {
            aircraft.serial_number = input::optional(Some(serial_number));
        }
        if let Some(hours) = update.total_hours {
            aircraft.total_hours = input::non_negative("total_hours", hours)?;
        }
        if let Some(at) = update.last_inspection {
            aircraft.last_inspection = Some(ensure_storable(at)?);
        }
        if let Some(at) = update.next_inspection {
            aircraft.next_inspection = Some(ensure_storable(at)?);
        }

        self.storage.upsert_aircraft(&aircraft)?;
        debug!("Updated aircraft {}", aircraft.id);
        Ok(aircraft)
    }

    /// Delete an aircraft with its sheets, items and history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such aircraft.
    pub fn remove_aircraft(&self, id: Uuid) -> Result<()> {
        if self.storage.delete_aircraft(id)? {
            Ok(())
        } else {
            Err(Error::not_found("aircraft", id))
        }
    }

    // === Sheets ===

    /// Create an empty maintenance sheet for an aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is blank, the aircraft does not exist,
    /// or the database operation fails.
    pub fn create_sheet(
        &self,
        aircraft_id: Uuid,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceSheet> {
        let title = input::required("title", title)?;
        let aircraft = self.aircraft(aircraft_id)?;

        let sheet = MaintenanceSheet::new(aircraft.id, title, now);
        self.storage.upsert_sheet(&sheet)?;
        info!(
            "Created sheet '{}' for {} ({})",
            sheet.title, aircraft.registration, sheet.id
        );
        Ok(sheet)
    }

    /// Look up a sheet with its items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such sheet.
    pub fn sheet(&self, id: Uuid) -> Result<MaintenanceSheet> {
        self.storage
            .get_sheet(id)?
            .ok_or_else(|| Error::not_found("sheet", id))
    }

    /// Sheets for one aircraft, or for the whole fleet when `aircraft_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the aircraft does not exist or the database
    /// operation fails.
    pub fn sheets(&self, aircraft_id: Option<Uuid>) -> Result<Vec<MaintenanceSheet>> {
        match aircraft_id {
            Some(id) => {
                let aircraft = self.aircraft(id)?;
                self.storage.list_sheets_for_aircraft(aircraft.id)
            }
            None => self.storage.list_sheets(),
        }
    }

    /// Delete a sheet and its items. History is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such sheet.
    pub fn remove_sheet(&self, id: Uuid) -> Result<()> {
        if self.storage.delete_sheet(id)? {
            Ok(())
        } else {
            Err(Error::not_found("sheet", id))
        }
    }

    // === Items ===

    /// Append an item to a sheet.
    ///
    /// # Errors
    ///
    /// Returns an error if the description is blank, the interval is not
    /// positive, the sheet does not exist, or the database operation fails.
    pub fn add_item(
        &self,
        sheet_id: Uuid,
        new: NewItem,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceItem> {
        let description = input::required("description", &new.description)?;
        let interval = IntervalDays::new(new.interval_days)?;
        let mut sheet = self.sheet(sheet_id)?;

        let last_completed_at = new.last_completed_at.map(ensure_storable).transpose()?;
        let mut item = MaintenanceItem::new(description, interval, last_completed_at);
        item.notes = input::optional(new.notes);
        // Rejects a last completion whose next-due date cannot be represented.
        item.next_due_at()?;

        sheet.items.push(item.clone());
        sheet.touch(now);
        self.storage.upsert_sheet(&sheet)?;
        debug!("Added item {} to sheet {}", item.id, sheet.id);
        Ok(item)
    }

    /// Mark an item as performed at `now` and record it in the history.
    ///
    /// The item, its sheet and the new record are written together or not
    /// at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist, the hours are negative,
    /// the next-due date falls past year 9999, or the database operation fails.
    pub fn complete_item(
        &self,
        item_id: Uuid,
        completion: Completion,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceRecord> {
        let now = ensure_storable(now)?;
        let mut sheet = self.sheet_for_item(item_id)?;
        let aircraft = self.aircraft(sheet.aircraft_id)?;
        let hours_at_completion = match completion.hours_at_completion {
            Some(hours) => input::non_negative("hours_at_completion", hours)?,
            None => aircraft.total_hours,
        };

        let item = sheet
            .item_mut(item_id)
            .ok_or_else(|| Error::not_found("item", item_id))?;
        item.complete(now);
        // Always set: the item was just completed.
        let next_due_at = item.next_due_at()?.unwrap_or(now);

        let record = MaintenanceRecord {
            id: Uuid::new_v4(),
            aircraft_id: aircraft.id,
            maintenance_item_id: item.id,
            description: item.description.clone(),
            completed_at: now,
            hours_at_completion: Some(hours_at_completion),
            technician: input::optional(completion.technician),
            notes: input::optional(completion.notes),
            next_due_at,
        };

        sheet.touch(now);
        self.storage.record_completion(&sheet, &record)?;
        info!(
            "Completed '{}' on {}, next due {}",
            record.description,
            aircraft.registration,
            record.next_due_at.format("%Y-%m-%d")
        );
        Ok(record)
    }

    /// Remove an item from its sheet. Its history is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such item.
    pub fn remove_item(&self, item_id: Uuid, now: DateTime<Utc>) -> Result<MaintenanceItem> {
        let mut sheet = self.sheet_for_item(item_id)?;
        let item = sheet
            .remove_item(item_id)
            .ok_or_else(|| Error::not_found("item", item_id))?;

        sheet.touch(now);
        self.storage.upsert_sheet(&sheet)?;
        debug!("Removed item {} from sheet {}", item.id, sheet.id);
        Ok(item)
    }

    fn sheet_for_item(&self, item_id: Uuid) -> Result<MaintenanceSheet> {
        self.storage
            .find_sheet_by_item(item_id)?
            .ok_or_else(|| Error::not_found("item", item_id))
    }

    // === Views ===

    /// A sheet with every item evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sheet does not exist or an item's next-due
    /// date is out of range.
    pub fn sheet_view(&self, sheet_id: Uuid, now: DateTime<Utc>) -> Result<SheetView> {
        let sheet = self.sheet(sheet_id)?;
        self.evaluate_sheet(sheet, now)
    }

    /// An aircraft with its inspection outlook and sheet summaries at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the aircraft does not exist or an item's next-due
    /// date is out of range.
    pub fn aircraft_view(&self, aircraft_id: Uuid, now: DateTime<Utc>) -> Result<AircraftView> {
        let aircraft = self.aircraft(aircraft_id)?;
        let mut summary = StatusSummary::default();
        let mut sheets = Vec::new();

        for sheet in self.storage.list_sheets_for_aircraft(aircraft.id)? {
            let sheet_summary = sheet.summary(&self.policy, now)?;
            summary.merge(&sheet_summary);
            sheets.push(SheetOverview {
                id: sheet.id,
                title: sheet.title,
                item_count: sheet.items.len(),
                updated_at: sheet.updated_at,
                summary: sheet_summary,
            });
        }

        Ok(AircraftView {
            inspection: self.policy.inspection_outlook(now, aircraft.next_inspection),
            aircraft,
            sheets,
            summary,
        })
    }

    /// Status of every aircraft in the fleet at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or an item's
    /// next-due date is out of range.
    pub fn fleet_view(&self, now: DateTime<Utc>) -> Result<FleetView> {
        let mut summary = StatusSummary::default();
        let mut entries = Vec::new();

        for aircraft in self.storage.list_aircraft()? {
            let mut aircraft_summary = StatusSummary::default();
            for sheet in self.storage.list_sheets_for_aircraft(aircraft.id)? {
                aircraft_summary.merge(&sheet.summary(&self.policy, now)?);
            }
            summary.merge(&aircraft_summary);

            entries.push(FleetEntry {
                id: aircraft.id,
                type_designation: aircraft.type_designation(),
                inspection: self.policy.inspection_outlook(now, aircraft.next_inspection),
                registration: aircraft.registration,
                summary: aircraft_summary,
            });
        }

        Ok(FleetView {
            aircraft: entries,
            summary,
        })
    }

    /// Completion records for an aircraft, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the aircraft does not exist or the database
    /// operation fails.
    pub fn history(&self, aircraft_id: Uuid, limit: usize) -> Result<Vec<MaintenanceRecord>> {
        let aircraft = self.aircraft(aircraft_id)?;
        self.storage.list_records_for_aircraft(aircraft.id, limit)
    }

    fn evaluate_sheet(&self, sheet: MaintenanceSheet, now: DateTime<Utc>) -> Result<SheetView> {
        let mut summary = StatusSummary::default();
        let mut items = Vec::with_capacity(sheet.items.len());

        for item in sheet.items {
            let status = item.status(&self.policy, now)?;
            summary.record(status);
            items.push(ItemView {
                next_due_at: item.next_due_at()?,
                item,
                status,
            });
        }

        Ok(SheetView {
            id: sheet.id,
            aircraft_id: sheet.aircraft_id,
            title: sheet.title,
            created_at: sheet.created_at,
            updated_at: sheet.updated_at,
            items,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn new_aircraft(registration: &str) -> NewAircraft {
        NewAircraft {
            registration: registration.to_string(),
            manufacturer: "Robinson".to_string(),
            model: "R44".to_string(),
            ..NewAircraft::default()
        }
    }

    fn new_item(description: &str, interval_days: i64, last: Option<DateTime<Utc>>) -> NewItem {
        NewItem {
            description: description.to_string(),
            interval_days,
            last_completed_at: last,
            notes: None,
        }
    }

    struct Fixture {
        storage: Storage,
    }

    impl Fixture {
        fn new() -> Self {
            crate::logging::init_test_logging();
            Self {
                storage: Storage::open_in_memory().unwrap(),
            }
        }

        fn tracker(&self) -> Tracker<'_> {
            Tracker::new(&self.storage, StatusPolicy::default())
        }
    }

    #[test]
    fn test_register_aircraft() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();

        let aircraft = tracker
            .register_aircraft(
                NewAircraft {
                    total_hours: Some(1520.5),
                    serial_number: Some(" 14021 ".to_string()),
                    ..new_aircraft(" N44RH ")
                },
                now(),
            )
            .unwrap();

        assert_eq!(aircraft.registration, "N44RH");
        assert_eq!(aircraft.serial_number.as_deref(), Some("14021"));
        assert_eq!(tracker.aircraft(aircraft.id).unwrap(), aircraft);
    }

    #[test]
    fn test_register_duplicate_registration() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        tracker
            .register_aircraft(new_aircraft("N12345"), now())
            .unwrap();

        let err = tracker
            .register_aircraft(new_aircraft("n12345"), now())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { .. }));
        assert_eq!(tracker.fleet().unwrap().len(), 1);
    }

    #[test]
    fn test_register_aircraft_validation() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();

        assert!(tracker.register_aircraft(new_aircraft(""), now()).is_err());
        let err = tracker
            .register_aircraft(
                NewAircraft {
                    total_hours: Some(-5.0),
                    ..new_aircraft("N1")
                },
                now(),
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert!(tracker.fleet().unwrap().is_empty());
    }

    #[test]
    fn test_update_aircraft() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();

        let next = now() + Duration::days(90);
        let updated = tracker
            .update_aircraft(
                aircraft.id,
                AircraftUpdate {
                    total_hours: Some(200.0),
                    next_inspection: Some(next),
                    ..AircraftUpdate::default()
                },
            )
            .unwrap();

        assert!((updated.total_hours - 200.0).abs() < f64::EPSILON);
        assert_eq!(updated.next_inspection, Some(next));
        assert_eq!(updated.registration, "N1");
        assert_eq!(tracker.aircraft(aircraft.id).unwrap(), updated);
    }

    #[test]
    fn test_update_aircraft_rejects_empty_update() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();

        assert!(tracker
            .update_aircraft(aircraft.id, AircraftUpdate::default())
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_update_missing_aircraft() {
        let fixture = Fixture::new();
        let err = fixture
            .tracker()
            .update_aircraft(
                Uuid::new_v4(),
                AircraftUpdate {
                    total_hours: Some(1.0),
                    ..AircraftUpdate::default()
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_sheet_requires_aircraft() {
        let fixture = Fixture::new();
        let err = fixture
            .tracker()
            .create_sheet(Uuid::new_v4(), "Annual", now())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_add_item_bumps_updated_at() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();

        let later = now() + Duration::hours(3);
        let item = tracker
            .add_item(sheet.id, new_item("Oil change", 50, None), later)
            .unwrap();

        let stored = tracker.sheet(sheet.id).unwrap();
        assert_eq!(stored.updated_at, later);
        assert_eq!(stored.items, vec![item]);
    }

    #[test]
    fn test_add_item_rejects_non_positive_interval() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();

        let err = tracker
            .add_item(sheet.id, new_item("Oil change", 0, None), now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(tracker.sheet(sheet.id).unwrap().items.is_empty());
    }

    #[test]
    fn test_complete_item_records_history() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker
            .register_aircraft(
                NewAircraft {
                    total_hours: Some(812.0),
                    ..new_aircraft("N1")
                },
                now(),
            )
            .unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        let item = tracker
            .add_item(sheet.id, new_item("Rotor inspection", 100, None), now())
            .unwrap();

        let before = tracker.sheet_view(sheet.id, now()).unwrap();
        assert_eq!(before.items[0].status, MaintenanceStatus::Due);

        let completed_at = now() + Duration::days(1);
        let record = tracker
            .complete_item(
                item.id,
                Completion {
                    technician: Some("J. Smith".to_string()),
                    ..Completion::default()
                },
                completed_at,
            )
            .unwrap();

        assert_eq!(record.maintenance_item_id, item.id);
        assert_eq!(record.hours_at_completion, Some(812.0));
        assert_eq!(record.next_due_at, completed_at + Duration::days(100));

        let after = tracker.sheet_view(sheet.id, completed_at).unwrap();
        assert_eq!(after.items[0].status, MaintenanceStatus::Current);
        assert_eq!(after.updated_at, completed_at);
        assert_eq!(tracker.history(aircraft.id, 10).unwrap(), vec![record]);
    }

    #[test]
    fn test_complete_item_past_year_9999_leaves_item_untouched() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        let item = tracker
            .add_item(sheet.id, new_item("Airframe overhaul", 3_000_000, None), now())
            .unwrap();

        let err = tracker
            .complete_item(item.id, Completion::default(), now() + Duration::days(1))
            .unwrap_err();
        assert!(err.is_validation());

        let stored = tracker.sheet(sheet.id).unwrap();
        assert_eq!(stored.items[0].last_completed_at, None);
        assert_eq!(stored.updated_at, now());
        assert!(tracker.history(aircraft.id, 10).unwrap().is_empty());
        assert_eq!(
            tracker.sheet_view(sheet.id, now()).unwrap().items[0].status,
            MaintenanceStatus::Due
        );
    }

    #[test]
    fn test_complete_item_rolls_back_when_history_write_fails() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        let item = tracker
            .add_item(sheet.id, new_item("Oil change", 50, None), now())
            .unwrap();
        fixture
            .storage
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_records BEFORE INSERT ON maintenance_records
                 BEGIN SELECT RAISE(ABORT, 'records unavailable'); END;",
            )
            .unwrap();

        let result = tracker.complete_item(item.id, Completion::default(), now() + Duration::days(1));
        assert!(result.is_err());

        let stored = tracker.sheet(sheet.id).unwrap();
        assert_eq!(stored.items[0].last_completed_at, None);
        assert_eq!(stored.updated_at, now());
        assert!(tracker.history(aircraft.id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_unstorable_dates_rejected() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let far_future = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();

        let err = tracker
            .register_aircraft(
                NewAircraft {
                    next_inspection: Some(far_future),
                    ..new_aircraft("N1")
                },
                now(),
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert!(tracker.fleet().unwrap().is_empty());

        let aircraft = tracker.register_aircraft(new_aircraft("N2"), now()).unwrap();
        let err = tracker
            .update_aircraft(
                aircraft.id,
                AircraftUpdate {
                    last_inspection: Some(far_future),
                    ..AircraftUpdate::default()
                },
            )
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(tracker.aircraft(aircraft.id).unwrap().last_inspection, None);

        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        let err = tracker
            .add_item(sheet.id, new_item("Oil change", 50, Some(far_future)), now())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(tracker.fleet_view(now()).is_ok());
    }

    #[test]
    fn test_complete_missing_item() {
        let fixture = Fixture::new();
        let err = fixture
            .tracker()
            .complete_item(Uuid::new_v4(), Completion::default(), now())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_item_keeps_history() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        let item = tracker
            .add_item(sheet.id, new_item("Oil change", 50, None), now())
            .unwrap();
        tracker
            .complete_item(item.id, Completion::default(), now())
            .unwrap();

        let later = now() + Duration::days(2);
        let removed = tracker.remove_item(item.id, later).unwrap();
        assert_eq!(removed.id, item.id);

        let stored = tracker.sheet(sheet.id).unwrap();
        assert!(stored.items.is_empty());
        assert_eq!(stored.updated_at, later);
        assert_eq!(tracker.history(aircraft.id, 10).unwrap().len(), 1);
        assert!(tracker.remove_item(item.id, later).unwrap_err().is_not_found());
    }

    #[test]
    fn test_status_is_evaluated_on_read() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        tracker
            .add_item(sheet.id, new_item("Oil change", 100, Some(now())), now())
            .unwrap();

        let statuses: Vec<MaintenanceStatus> = [0, 75, 101]
            .into_iter()
            .map(|days| {
                tracker
                    .sheet_view(sheet.id, now() + Duration::days(days))
                    .unwrap()
                    .items[0]
                    .status
            })
            .collect();

        assert_eq!(
            statuses,
            vec![
                MaintenanceStatus::Current,
                MaintenanceStatus::Due,
                MaintenanceStatus::Overdue
            ]
        );
        assert_eq!(tracker.sheet(sheet.id).unwrap().updated_at, now());
    }

    #[test]
    fn test_custom_due_window() {
        let fixture = Fixture::new();
        let tracker = Tracker::new(
            &fixture.storage,
            StatusPolicy::with_due_window_days(7).unwrap(),
        );
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        tracker
            .add_item(
                sheet.id,
                new_item("Oil change", 30, Some(now() - Duration::days(10))),
                now(),
            )
            .unwrap();

        let view = tracker.sheet_view(sheet.id, now()).unwrap();
        assert_eq!(view.items[0].status, MaintenanceStatus::Current);
        assert_eq!(
            view.items[0].next_due_at,
            Some(now() + Duration::days(20))
        );
    }

    #[test]
    fn test_aircraft_view() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker
            .register_aircraft(
                NewAircraft {
                    next_inspection: Some(now() + Duration::days(10)),
                    ..new_aircraft("N1")
                },
                now(),
            )
            .unwrap();
        let annual = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        let hundred = tracker
            .create_sheet(aircraft.id, "100-Hour", now() + Duration::seconds(1))
            .unwrap();
        tracker
            .add_item(
                annual.id,
                new_item("ELT battery", 10, Some(now() - Duration::days(20))),
                now(),
            )
            .unwrap();
        tracker
            .add_item(
                hundred.id,
                new_item("Oil change", 100, Some(now() - Duration::days(5))),
                now(),
            )
            .unwrap();

        let view = tracker.aircraft_view(aircraft.id, now()).unwrap();
        assert_eq!(view.sheets.len(), 2);
        assert_eq!(view.sheets[0].summary.dominant(), MaintenanceStatus::Overdue);
        assert_eq!(view.sheets[1].summary.dominant(), MaintenanceStatus::Current);
        assert_eq!(view.summary.total(), 2);
        assert_eq!(view.summary.dominant(), MaintenanceStatus::Overdue);

        let inspection = view.inspection.unwrap();
        assert_eq!(inspection.days_remaining, 10);
        assert_eq!(inspection.status, MaintenanceStatus::Due);
    }

    #[test]
    fn test_fleet_view() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let first = tracker.register_aircraft(new_aircraft("N2"), now()).unwrap();
        tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(first.id, "Annual", now()).unwrap();
        tracker
            .add_item(sheet.id, new_item("Oil change", 50, None), now())
            .unwrap();

        let view = tracker.fleet_view(now()).unwrap();
        let registrations: Vec<&str> = view
            .aircraft
            .iter()
            .map(|a| a.registration.as_str())
            .collect();
        assert_eq!(registrations, vec!["N1", "N2"]);
        assert_eq!(view.aircraft[0].summary.dominant(), MaintenanceStatus::Current);
        assert_eq!(view.aircraft[1].summary.due, 1);
        assert_eq!(view.summary.dominant(), MaintenanceStatus::Due);
    }

    #[test]
    fn test_empty_fleet_is_current() {
        let fixture = Fixture::new();
        let view = fixture.tracker().fleet_view(now()).unwrap();
        assert!(view.aircraft.is_empty());
        assert_eq!(view.summary.dominant(), MaintenanceStatus::Current);
    }

    #[test]
    fn test_remove_aircraft_removes_sheets() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        tracker
            .add_item(sheet.id, new_item("Oil change", 50, None), now())
            .unwrap();

        tracker.remove_aircraft(aircraft.id).unwrap();

        assert!(tracker.sheet(sheet.id).unwrap_err().is_not_found());
        assert!(tracker.sheets(None).unwrap().is_empty());
        assert!(tracker.remove_aircraft(aircraft.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_remove_sheet() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();

        tracker.remove_sheet(sheet.id).unwrap();
        assert!(tracker.sheets(Some(aircraft.id)).unwrap().is_empty());
        assert!(tracker.remove_sheet(sheet.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_item_view_serializes_status() {
        let fixture = Fixture::new();
        let tracker = fixture.tracker();
        let aircraft = tracker.register_aircraft(new_aircraft("N1"), now()).unwrap();
        let sheet = tracker.create_sheet(aircraft.id, "Annual", now()).unwrap();
        tracker
            .add_item(sheet.id, new_item("Oil change", 50, None), now())
            .unwrap();

        let json = serde_json::to_value(tracker.sheet_view(sheet.id, now()).unwrap()).unwrap();
        assert_eq!(json["items"][0]["status"], "due");
        assert_eq!(json["items"][0]["description"], "Oil change");
        assert_eq!(json["summary"]["due"], 1);
    }
}
