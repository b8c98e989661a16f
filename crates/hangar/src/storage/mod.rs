//! Storage layer for hangar.
//!
//! This module provides `SQLite`-based persistence for the fleet, its
//! maintenance sheets and history, and the parts catalog. It is the
//! persistence collaborator for the tracker and catalog services: it lists
//! and upserts records and never evaluates status itself.

pub mod migrations;
pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{Product, Vendor};
use crate::error::{Error, Result};
use crate::model::{Aircraft, MaintenanceItem, MaintenanceRecord, MaintenanceSheet};
use crate::status::IntervalDays;

const AIRCRAFT_COLUMNS: &str = "id, registration, manufacturer, model, serial_number, \
     total_hours, last_inspection, next_inspection, created_at";

const SHEET_COLUMNS: &str = "id, aircraft_id, title, created_at, updated_at";

const RECORD_COLUMNS: &str = "id, aircraft_id, maintenance_item_id, description, completed_at, \
     hours_at_completion, technician, notes, next_due_at";

const PRODUCT_COLUMNS: &str =
    "id, part_number, name, description, price, image_url, category, vendor_id, created_at";

/// Storage engine for hangar records.
///
/// Wraps a single `SQLite` connection. Opened once by the entry point and
/// passed by reference to whatever needs it.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // === Aircraft ===

    /// Insert an aircraft or update it in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including a
    /// registration uniqueness violation.
    pub fn upsert_aircraft(&self, aircraft: &Aircraft) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO aircraft (id, registration, manufacturer, model, serial_number,
                                  total_hours, last_inspection, next_inspection, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                registration = excluded.registration,
                manufacturer = excluded.manufacturer,
                model = excluded.model,
                serial_number = excluded.serial_number,
                total_hours = excluded.total_hours,
                last_inspection = excluded.last_inspection,
                next_inspection = excluded.next_inspection
            ",
            params![
                aircraft.id.to_string(),
                aircraft.registration,
                aircraft.manufacturer,
                aircraft.model,
                aircraft.serial_number,
                aircraft.total_hours,
                aircraft.last_inspection.as_ref().map(format_time),
                aircraft.next_inspection.as_ref().map(format_time),
                format_time(&aircraft.created_at),
            ],
        )?;
        debug!("Upserted aircraft {}", aircraft.id);
        Ok(())
    }

    /// Get an aircraft by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_aircraft(&self, id: Uuid) -> Result<Option<Aircraft>> {
        let sql = format!("SELECT {AIRCRAFT_COLUMNS} FROM aircraft WHERE id = ?1");
        let aircraft = self
            .conn
            .query_row(&sql, [id.to_string()], Self::row_to_aircraft)
            .optional()?;
        Ok(aircraft)
    }

    /// Find an aircraft by registration, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_aircraft_by_registration(&self, registration: &str) -> Result<Option<Aircraft>> {
        let sql = format!(
            "SELECT {AIRCRAFT_COLUMNS} FROM aircraft WHERE registration = ?1 COLLATE NOCASE"
        );
        let aircraft = self
            .conn
            .query_row(&sql, [registration], Self::row_to_aircraft)
            .optional()?;
        Ok(aircraft)
    }

    /// List every aircraft, ordered by registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_aircraft(&self) -> Result<Vec<Aircraft>> {
        let sql = format!("SELECT {AIRCRAFT_COLUMNS} FROM aircraft ORDER BY registration");
        let mut stmt = self.conn.prepare(&sql)?;
        let aircraft = stmt
            .query_map([], Self::row_to_aircraft)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(aircraft)
    }

    /// Delete an aircraft together with its sheets, items and records.
    ///
    /// Returns `true` if an aircraft was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_aircraft(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM aircraft WHERE id = ?1", [id.to_string()])?;
        if affected > 0 {
            info!("Deleted aircraft {} and its maintenance data", id);
        }
        Ok(affected > 0)
    }

    // === Maintenance sheets ===

    /// Insert a sheet or update it in place, replacing its items.
    ///
    /// Items are rewritten in the order they appear in `sheet.items`, so
    /// items removed from the sheet are removed from storage too.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is written
    /// in that case.
    pub fn upsert_sheet(&self, sheet: &MaintenanceSheet) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_sheet(&tx, sheet)?;
        tx.commit()?;
        debug!(
            "Upserted sheet {} with {} items",
            sheet.id,
            sheet.items.len()
        );
        Ok(())
    }

    /// Get a sheet and its items by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_sheet(&self, id: Uuid) -> Result<Option<MaintenanceSheet>> {
        let sql = format!("SELECT {SHEET_COLUMNS} FROM maintenance_sheets WHERE id = ?1");
        let sheet = self
            .conn
            .query_row(&sql, [id.to_string()], Self::row_to_sheet)
            .optional()?;

        match sheet {
            Some(mut sheet) => {
                sheet.items = self.load_items(sheet.id)?;
                Ok(Some(sheet))
            }
            None => Ok(None),
        }
    }

    /// Find the sheet that owns the given item.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_sheet_by_item(&self, item_id: Uuid) -> Result<Option<MaintenanceSheet>> {
        let sheet_id: Option<String> = self
            .conn
            .query_row(
                "SELECT sheet_id FROM maintenance_items WHERE id = ?1",
                [item_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match sheet_id {
            Some(sheet_id) => {
                let sheet_id = Uuid::parse_str(&sheet_id)
                    .map_err(|e| conversion_error(0, e))
                    .map_err(Error::from)?;
                self.get_sheet(sheet_id)
            }
            None => Ok(None),
        }
    }

    /// List every sheet with its items, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_sheets(&self) -> Result<Vec<MaintenanceSheet>> {
        let sql =
            format!("SELECT {SHEET_COLUMNS} FROM maintenance_sheets ORDER BY created_at, title");
        let mut stmt = self.conn.prepare(&sql)?;
        let sheets = stmt
            .query_map([], Self::row_to_sheet)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.with_items(sheets)
    }

    /// List an aircraft's sheets with their items, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_sheets_for_aircraft(&self, aircraft_id: Uuid) -> Result<Vec<MaintenanceSheet>> {
        let sql = format!(
            "SELECT {SHEET_COLUMNS} FROM maintenance_sheets WHERE aircraft_id = ?1 \
             ORDER BY created_at, title"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sheets = stmt
            .query_map([aircraft_id.to_string()], Self::row_to_sheet)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.with_items(sheets)
    }

    /// Delete a sheet and its items.
    ///
    /// Returns `true` if a sheet was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_sheet(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM maintenance_sheets WHERE id = ?1",
            [id.to_string()],
        )?;
        Ok(affected > 0)
    }

    fn with_items(&self, mut sheets: Vec<MaintenanceSheet>) -> Result<Vec<MaintenanceSheet>> {
        for sheet in &mut sheets {
            sheet.items = self.load_items(sheet.id)?;
        }
        Ok(sheets)
    }

    fn load_items(&self, sheet_id: Uuid) -> Result<Vec<MaintenanceItem>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, description, interval_days, last_completed_at, notes
            FROM maintenance_items WHERE sheet_id = ?1 ORDER BY position
            ",
        )?;
        let items = stmt
            .query_map([sheet_id.to_string()], Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // === Maintenance records ===

    /// Save a sheet whose item was just completed together with the
    /// completion record, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails; neither is kept in that case.
    pub fn record_completion(
        &self,
        sheet: &MaintenanceSheet,
        record: &MaintenanceRecord,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_sheet(&tx, sheet)?;
        write_record(&tx, record)?;
        tx.commit()?;
        debug!(
            "Recorded completion of item {} on aircraft {}",
            record.maintenance_item_id, record.aircraft_id
        );
        Ok(())
    }

    /// List an aircraft's completion records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_records_for_aircraft(
        &self,
        aircraft_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MaintenanceRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM maintenance_records WHERE aircraft_id = ?1 \
             ORDER BY completed_at DESC LIMIT ?2"
        );
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![aircraft_id.to_string(), limit_i64],
                Self::row_to_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    // === Vendors ===

    /// Insert a vendor or update it in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_vendor(&self, vendor: &Vendor) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO vendors (id, name, contact_email, phone)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                contact_email = excluded.contact_email,
                phone = excluded.phone
            ",
            params![
                vendor.id.to_string(),
                vendor.name,
                vendor.contact_email,
                vendor.phone,
            ],
        )?;
        Ok(())
    }

    /// Get a vendor by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_vendor(&self, id: Uuid) -> Result<Option<Vendor>> {
        let vendor = self
            .conn
            .query_row(
                "SELECT id, name, contact_email, phone FROM vendors WHERE id = ?1",
                [id.to_string()],
                Self::row_to_vendor,
            )
            .optional()?;
        Ok(vendor)
    }

    /// List every vendor, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_vendors(&self) -> Result<Vec<Vendor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, contact_email, phone FROM vendors ORDER BY name")?;
        let vendors = stmt
            .query_map([], Self::row_to_vendor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vendors)
    }

    // === Products ===

    /// Insert a product or update it in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_product(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO products (id, part_number, name, description, price, image_url,
                                  category, vendor_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                part_number = excluded.part_number,
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                image_url = excluded.image_url,
                category = excluded.category,
                vendor_id = excluded.vendor_id
            ",
            params![
                product.id.to_string(),
                product.part_number,
                product.name,
                product.description,
                product.price,
                product.image_url,
                product.category,
                product.vendor_id.map(|id| id.to_string()),
                format_time(&product.created_at),
            ],
        )?;
        Ok(())
    }

    /// List the most recently added products.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_products(&self, limit: usize) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, part_number LIMIT ?1"
        );
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let products = stmt
            .query_map([limit_i64], Self::row_to_product)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(products)
    }

    /// Search products whose part number or name contains `query`.
    ///
    /// Matching is a case-insensitive substring match; `%` and `_` in the
    /// query are matched literally.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_products(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE part_number LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\' \
             ORDER BY part_number LIMIT ?2"
        );
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![pattern, limit_i64], Self::row_to_product)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(products)
    }

    // === Statistics ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            aircraft: self.count("aircraft")?,
            sheets: self.count("maintenance_sheets")?,
            items: self.count("maintenance_items")?,
            records: self.count("maintenance_records")?,
            vendors: self.count("vendors")?,
            products: self.count("products")?,
            db_size_bytes,
        })
    }

    fn count(&self, table: &'static str) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }

    // === Row mapping ===

    fn row_to_aircraft(row: &rusqlite::Row) -> rusqlite::Result<Aircraft> {
        Ok(Aircraft {
            id: parse_uuid(row, 0)?,
            registration: row.get(1)?,
            manufacturer: row.get(2)?,
            model: row.get(3)?,
            serial_number: row.get(4)?,
            total_hours: row.get(5)?,
            last_inspection: parse_optional_time(row, 6)?,
            next_inspection: parse_optional_time(row, 7)?,
            created_at: parse_time(row, 8)?,
        })
    }

    fn row_to_sheet(row: &rusqlite::Row) -> rusqlite::Result<MaintenanceSheet> {
        Ok(MaintenanceSheet {
            id: parse_uuid(row, 0)?,
            aircraft_id: parse_uuid(row, 1)?,
            title: row.get(2)?,
            created_at: parse_time(row, 3)?,
            updated_at: parse_time(row, 4)?,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<MaintenanceItem> {
        let interval_days: i64 = row.get(2)?;
        let interval = IntervalDays::new(interval_days)
            .map_err(|e| conversion_error_typed(2, Type::Integer, e))?;

        Ok(MaintenanceItem {
            id: parse_uuid(row, 0)?,
            description: row.get(1)?,
            interval,
            last_completed_at: parse_optional_time(row, 3)?,
            notes: row.get(4)?,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MaintenanceRecord> {
        Ok(MaintenanceRecord {
            id: parse_uuid(row, 0)?,
            aircraft_id: parse_uuid(row, 1)?,
            maintenance_item_id: parse_uuid(row, 2)?,
            description: row.get(3)?,
            completed_at: parse_time(row, 4)?,
            hours_at_completion: row.get(5)?,
            technician: row.get(6)?,
            notes: row.get(7)?,
            next_due_at: parse_time(row, 8)?,
        })
    }

    fn row_to_vendor(row: &rusqlite::Row) -> rusqlite::Result<Vendor> {
        Ok(Vendor {
            id: parse_uuid(row, 0)?,
            name: row.get(1)?,
            contact_email: row.get(2)?,
            phone: row.get(3)?,
        })
    }

    fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        let vendor_id: Option<String> = row.get(7)?;
        let vendor_id = vendor_id
            .map(|id| Uuid::parse_str(&id).map_err(|e| conversion_error(7, e)))
            .transpose()?;

        Ok(Product {
            id: parse_uuid(row, 0)?,
            part_number: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            price: row.get(4)?,
            image_url: row.get(5)?,
            category: row.get(6)?,
            vendor_id,
            created_at: parse_time(row, 8)?,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of aircraft.
    pub aircraft: i64,
    /// Number of maintenance sheets.
    pub sheets: i64,
    /// Number of maintenance items across all sheets.
    pub items: i64,
    /// Number of completion records.
    pub records: i64,
    /// Number of vendors.
    pub vendors: i64,
    /// Number of products.
    pub products: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} aircraft, {} sheets, {} items, {} completions, {} vendors, {} parts",
            self.aircraft, self.sheets, self.items, self.records, self.vendors, self.products
        )?;
        if self.db_size_bytes > 0 {
            let tenths = self.db_size_bytes.saturating_mul(10) / 1024;
            write!(f, " ({}.{} KiB on disk)", tenths / 10, tenths % 10)?;
        }
        Ok(())
    }
}

fn write_sheet(conn: &Connection, sheet: &MaintenanceSheet) -> Result<()> {
    let sheet_id = sheet.id.to_string();

    conn.execute(
        r"
        INSERT INTO maintenance_sheets (id, aircraft_id, title, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            aircraft_id = excluded.aircraft_id,
            title = excluded.title,
            updated_at = excluded.updated_at
        ",
        params![
            sheet_id,
            sheet.aircraft_id.to_string(),
            sheet.title,
            format_time(&sheet.created_at),
            format_time(&sheet.updated_at),
        ],
    )?;

    conn.execute(
        "DELETE FROM maintenance_items WHERE sheet_id = ?1",
        [&sheet_id],
    )?;

    let mut insert = conn.prepare(
        r"
        INSERT INTO maintenance_items
            (id, sheet_id, position, description, interval_days, last_completed_at, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )?;
    for (position, item) in sheet.items.iter().enumerate() {
        let position = i64::try_from(position).unwrap_or(i64::MAX);
        insert.execute(params![
            item.id.to_string(),
            sheet_id,
            position,
            item.description,
            item.interval.get(),
            item.last_completed_at.as_ref().map(format_time),
            item.notes,
        ])?;
    }
    Ok(())
}

fn write_record(conn: &Connection, record: &MaintenanceRecord) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO maintenance_records
            (id, aircraft_id, maintenance_item_id, description, completed_at,
             hours_at_completion, technician, notes, next_due_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ",
        params![
            record.id.to_string(),
            record.aircraft_id.to_string(),
            record.maintenance_item_id.to_string(),
            record.description,
            format_time(&record.completed_at),
            record.hours_at_completion,
            record.technician,
            record.notes,
            format_time(&record.next_due_at),
        ],
    )?;
    Ok(())
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_optional_time(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(idx, e))
        })
        .transpose()
}

fn parse_uuid(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(idx)?;
    Uuid::parse_str(&value).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    conversion_error_typed(idx, Type::Text, err)
}

fn conversion_error_typed<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Escape `LIKE` wildcards so the query is matched literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    fn create_test_aircraft(storage: &Storage, registration: &str) -> Aircraft {
        let aircraft = Aircraft::new(registration, "Robinson", "R44", now());
        storage.upsert_aircraft(&aircraft).unwrap();
        aircraft
    }

    fn create_test_sheet(storage: &Storage, aircraft: &Aircraft) -> MaintenanceSheet {
        let mut sheet = MaintenanceSheet::new(aircraft.id, "100-Hour Inspection", now());
        sheet.items.push(MaintenanceItem::new(
            "Oil change",
            IntervalDays::new(50).unwrap(),
            Some(now() - Duration::days(10)),
        ));
        sheet.items.push(MaintenanceItem::new(
            "Rotor blade inspection",
            IntervalDays::new(100).unwrap(),
            None,
        ));
        storage.upsert_sheet(&sheet).unwrap();
        sheet
    }

    fn completion_record(sheet: &MaintenanceSheet, completed_at: DateTime<Utc>) -> MaintenanceRecord {
        MaintenanceRecord {
            id: Uuid::new_v4(),
            aircraft_id: sheet.aircraft_id,
            maintenance_item_id: sheet.items[0].id,
            description: sheet.items[0].description.clone(),
            completed_at,
            hours_at_completion: Some(100.0),
            technician: Some("J. Smith".to_string()),
            notes: None,
            next_due_at: completed_at + Duration::days(50),
        }
    }

    fn create_test_product(part_number: &str, name: &str) -> Product {
        Product::new(part_number, name, now())
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_aircraft_roundtrip() {
        let storage = create_test_storage();
        let mut aircraft = Aircraft::new("N44RH", "Robinson", "R44", now());
        aircraft.serial_number = Some("14021".to_string());
        aircraft.total_hours = 1234.5;
        aircraft.next_inspection = Some(now() + Duration::days(45));
        storage.upsert_aircraft(&aircraft).unwrap();

        let loaded = storage.get_aircraft(aircraft.id).unwrap().unwrap();
        assert_eq!(loaded, aircraft);
    }

    #[test]
    fn test_aircraft_upsert_updates_in_place() {
        let storage = create_test_storage();
        let mut aircraft = create_test_aircraft(&storage, "N1");
        aircraft.total_hours = 99.0;
        storage.upsert_aircraft(&aircraft).unwrap();

        assert_eq!(storage.list_aircraft().unwrap().len(), 1);
        let loaded = storage.get_aircraft(aircraft.id).unwrap().unwrap();
        assert!((loaded.total_hours - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_nonexistent_aircraft() {
        let storage = create_test_storage();
        assert!(storage.get_aircraft(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_find_aircraft_by_registration_ignores_case() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N12345");

        let found = storage.find_aircraft_by_registration("n12345").unwrap();
        assert_eq!(found.map(|a| a.id), Some(aircraft.id));
        assert!(storage
            .find_aircraft_by_registration("N999")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_aircraft_ordered_by_registration() {
        let storage = create_test_storage();
        create_test_aircraft(&storage, "N3");
        create_test_aircraft(&storage, "N1");
        create_test_aircraft(&storage, "N2");

        let registrations: Vec<String> = storage
            .list_aircraft()
            .unwrap()
            .into_iter()
            .map(|a| a.registration)
            .collect();
        assert_eq!(registrations, vec!["N1", "N2", "N3"]);
    }

    #[test]
    fn test_duplicate_registration_rejected_by_schema() {
        let storage = create_test_storage();
        create_test_aircraft(&storage, "N1");

        let duplicate = Aircraft::new("N1", "Bell", "206", now());
        assert!(storage.upsert_aircraft(&duplicate).is_err());
    }

    #[test]
    fn test_registration_differing_only_in_case_rejected_by_schema() {
        let storage = create_test_storage();
        let original = create_test_aircraft(&storage, "N1");

        let lowercase = Aircraft::new("n1", "Bell", "206", now());
        assert!(storage.upsert_aircraft(&lowercase).is_err());
        assert_eq!(storage.list_aircraft().unwrap(), vec![original]);
    }

    #[test]
    fn test_sheet_roundtrip_preserves_item_order() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let sheet = create_test_sheet(&storage, &aircraft);

        let loaded = storage.get_sheet(sheet.id).unwrap().unwrap();
        assert_eq!(loaded, sheet);
        assert_eq!(loaded.items[0].description, "Oil change");
        assert_eq!(loaded.items[1].description, "Rotor blade inspection");
    }

    #[test]
    fn test_upsert_sheet_replaces_items() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let mut sheet = create_test_sheet(&storage, &aircraft);

        let removed = sheet.items.remove(0).id;
        sheet.touch(now() + Duration::hours(1));
        storage.upsert_sheet(&sheet).unwrap();

        let loaded = storage.get_sheet(sheet.id).unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.updated_at, now() + Duration::hours(1));
        assert!(storage.find_sheet_by_item(removed).unwrap().is_none());
        assert_eq!(storage.stats().unwrap().items, 1);
    }

    #[test]
    fn test_upsert_sheet_requires_existing_aircraft() {
        let storage = create_test_storage();
        let sheet = MaintenanceSheet::new(Uuid::new_v4(), "Orphan", now());
        assert!(storage.upsert_sheet(&sheet).is_err());
        assert_eq!(storage.stats().unwrap().sheets, 0);
    }

    #[test]
    fn test_find_sheet_by_item() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let sheet = create_test_sheet(&storage, &aircraft);

        let found = storage.find_sheet_by_item(sheet.items[1].id).unwrap();
        assert_eq!(found.map(|s| s.id), Some(sheet.id));
        assert!(storage.find_sheet_by_item(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_sheets_for_aircraft() {
        let storage = create_test_storage();
        let first = create_test_aircraft(&storage, "N1");
        let second = create_test_aircraft(&storage, "N2");
        create_test_sheet(&storage, &first);
        create_test_sheet(&storage, &first);
        create_test_sheet(&storage, &second);

        let sheets = storage.list_sheets_for_aircraft(first.id).unwrap();
        assert_eq!(sheets.len(), 2);
        assert!(sheets.iter().all(|s| s.items.len() == 2));
        assert_eq!(storage.list_sheets().unwrap().len(), 3);
    }

    #[test]
    fn test_delete_sheet_removes_items() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let sheet = create_test_sheet(&storage, &aircraft);

        assert!(storage.delete_sheet(sheet.id).unwrap());
        assert!(storage.get_sheet(sheet.id).unwrap().is_none());
        assert_eq!(storage.stats().unwrap().items, 0);
        assert!(!storage.delete_sheet(sheet.id).unwrap());
    }

    #[test]
    fn test_delete_aircraft_cascades() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let sheet = create_test_sheet(&storage, &aircraft);
        storage
            .record_completion(&sheet, &completion_record(&sheet, now()))
            .unwrap();

        assert!(storage.delete_aircraft(aircraft.id).unwrap());

        let stats = storage.stats().unwrap();
        assert_eq!(stats.aircraft, 0);
        assert_eq!(stats.sheets, 0);
        assert_eq!(stats.items, 0);
        assert_eq!(stats.records, 0);
    }

    #[test]
    fn test_delete_nonexistent_aircraft() {
        let storage = create_test_storage();
        assert!(!storage.delete_aircraft(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn test_records_most_recent_first() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let sheet = create_test_sheet(&storage, &aircraft);

        for days_ago in [30, 10, 20] {
            let record = MaintenanceRecord {
                description: format!("done {days_ago} days ago"),
                ..completion_record(&sheet, now() - Duration::days(days_ago))
            };
            storage.record_completion(&sheet, &record).unwrap();
        }

        let records = storage.list_records_for_aircraft(aircraft.id, 10).unwrap();
        let descriptions: Vec<&str> = records.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["done 10 days ago", "done 20 days ago", "done 30 days ago"]
        );
        assert_eq!(records[0].technician.as_deref(), Some("J. Smith"));

        assert_eq!(
            storage.list_records_for_aircraft(aircraft.id, 1).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_record_completion_writes_sheet_and_record() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let mut sheet = create_test_sheet(&storage, &aircraft);
        let completed_at = now() + Duration::days(1);
        sheet.items[1].complete(completed_at);
        sheet.touch(completed_at);
        let record = MaintenanceRecord {
            maintenance_item_id: sheet.items[1].id,
            ..completion_record(&sheet, completed_at)
        };

        storage.record_completion(&sheet, &record).unwrap();

        let stored = storage.get_sheet(sheet.id).unwrap().unwrap();
        assert_eq!(stored.items[1].last_completed_at, Some(completed_at));
        assert_eq!(stored.updated_at, completed_at);
        assert_eq!(
            storage.list_records_for_aircraft(aircraft.id, 10).unwrap(),
            vec![record]
        );
    }

    #[test]
    fn test_record_completion_is_all_or_nothing() {
        let storage = create_test_storage();
        let aircraft = create_test_aircraft(&storage, "N1");
        let original = create_test_sheet(&storage, &aircraft);
        storage
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_records BEFORE INSERT ON maintenance_records
                 BEGIN SELECT RAISE(ABORT, 'records unavailable'); END;",
            )
            .unwrap();

        let mut sheet = original.clone();
        let completed_at = now() + Duration::days(1);
        sheet.items[1].complete(completed_at);
        sheet.touch(completed_at);
        let record = completion_record(&sheet, completed_at);

        assert!(storage.record_completion(&sheet, &record).is_err());
        assert_eq!(storage.get_sheet(sheet.id).unwrap(), Some(original));
        assert_eq!(storage.stats().unwrap().records, 0);
    }

    #[test]
    fn test_vendor_roundtrip() {
        let storage = create_test_storage();
        let mut vendor = Vendor::new("Rotor Supply Co");
        vendor.contact_email = Some("sales@rotorsupply.example".to_string());
        storage.upsert_vendor(&vendor).unwrap();

        assert_eq!(storage.get_vendor(vendor.id).unwrap(), Some(vendor.clone()));
        assert_eq!(storage.list_vendors().unwrap(), vec![vendor]);
    }

    #[test]
    fn test_product_roundtrip() {
        let storage = create_test_storage();
        let vendor = Vendor::new("Rotor Supply Co");
        storage.upsert_vendor(&vendor).unwrap();

        let mut product = create_test_product("A123-4", "Tail rotor bearing");
        product.price = Some(249.99);
        product.vendor_id = Some(vendor.id);
        product.category = Some("Bearings".to_string());
        storage.upsert_product(&product).unwrap();

        assert_eq!(storage.list_products(10).unwrap(), vec![product]);
    }

    #[test]
    fn test_product_with_unknown_vendor_rejected() {
        let storage = create_test_storage();
        let mut product = create_test_product("A1", "Widget");
        product.vendor_id = Some(Uuid::new_v4());
        assert!(storage.upsert_product(&product).is_err());
    }

    #[test]
    fn test_search_products() {
        let storage = create_test_storage();
        storage
            .upsert_product(&create_test_product("C016-1", "Main rotor blade"))
            .unwrap();
        storage
            .upsert_product(&create_test_product("C016-2", "Tail rotor blade"))
            .unwrap();
        storage
            .upsert_product(&create_test_product("B289-3", "Fuel filter"))
            .unwrap();

        assert_eq!(storage.search_products("c016", 10).unwrap().len(), 2);
        assert_eq!(storage.search_products("ROTOR", 10).unwrap().len(), 2);
        assert_eq!(storage.search_products("filter", 10).unwrap().len(), 1);
        assert_eq!(storage.search_products("nothing", 10).unwrap().len(), 0);
        assert_eq!(storage.search_products("blade", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_search_products_escapes_wildcards() {
        let storage = create_test_storage();
        storage
            .upsert_product(&create_test_product("A_1", "Washer"))
            .unwrap();
        storage
            .upsert_product(&create_test_product("AB1", "Bolt"))
            .unwrap();

        let results = storage.search_products("A_1", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].part_number, "A_1");
        assert!(storage.search_products("%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_products_limit() {
        let storage = create_test_storage();
        for i in 0..5 {
            let mut product = create_test_product(&format!("P-{i}"), "Part");
            product.created_at = now() + Duration::minutes(i);
            storage.upsert_product(&product).unwrap();
        }

        let products = storage.list_products(3).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].part_number, "P-4");
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.aircraft, 0);
        assert_eq!(stats.sheets, 0);
        assert_eq!(stats.products, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_display_reports_every_count() {
        let stats = StorageStats {
            aircraft: 2,
            sheets: 3,
            items: 7,
            records: 11,
            vendors: 1,
            products: 4,
            db_size_bytes: 2048,
        };
        assert_eq!(
            stats.to_string(),
            "2 aircraft, 3 sheets, 7 items, 11 completions, 1 vendors, 4 parts (2.0 KiB on disk)"
        );

        let in_memory = StorageStats {
            db_size_bytes: 0,
            ..stats
        };
        assert!(!in_memory.to_string().contains("on disk"));
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("hangar.db");

        let storage = Storage::open(&db_path).unwrap();
        create_test_aircraft(&storage, "N1");
        assert_eq!(storage.path(), db_path);
        assert!(db_path.exists());
        drop(storage);

        let reopened = Storage::open(&db_path).unwrap();
        assert_eq!(reopened.list_aircraft().unwrap().len(), 1);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/hangar.db");

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());
        drop(storage);
    }

    #[test]
    fn test_open_under_a_file_reports_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Storage::open(blocker.join("data").join("hangar.db")).unwrap_err();
        match err {
            Error::DirectoryCreate { path, .. } => assert_eq!(path, blocker.join("data")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_format_time_is_fixed_width() {
        let a = format_time(&now());
        let b = format_time(&(now() + Duration::microseconds(1)));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
