//! `SQLite` schema definitions for hangar.
//!
//! Item status is deliberately absent: only the interval and the last
//! completion time are stored, and status is evaluated on read.

/// SQL statement to create the aircraft table.
pub const CREATE_AIRCRAFT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS aircraft (
    id TEXT PRIMARY KEY,
    registration TEXT NOT NULL UNIQUE COLLATE NOCASE,
    manufacturer TEXT NOT NULL,
    model TEXT NOT NULL,
    serial_number TEXT,
    total_hours REAL NOT NULL DEFAULT 0,
    last_inspection TEXT,
    next_inspection TEXT,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the maintenance sheets table.
pub const CREATE_SHEETS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS maintenance_sheets (
    id TEXT PRIMARY KEY,
    aircraft_id TEXT NOT NULL REFERENCES aircraft(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the maintenance items table.
pub const CREATE_ITEMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS maintenance_items (
    id TEXT PRIMARY KEY,
    sheet_id TEXT NOT NULL REFERENCES maintenance_sheets(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    description TEXT NOT NULL,
    interval_days INTEGER NOT NULL CHECK (interval_days > 0),
    last_completed_at TEXT,
    notes TEXT
)
";

/// SQL statement to create the maintenance records table.
///
/// `maintenance_item_id` is not a foreign key: history outlives the item.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS maintenance_records (
    id TEXT PRIMARY KEY,
    aircraft_id TEXT NOT NULL REFERENCES aircraft(id) ON DELETE CASCADE,
    maintenance_item_id TEXT NOT NULL,
    description TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    hours_at_completion REAL,
    technician TEXT,
    notes TEXT,
    next_due_at TEXT NOT NULL
)
";

/// SQL statement to create the vendors table.
pub const CREATE_VENDORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vendors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    contact_email TEXT,
    phone TEXT
)
";

/// SQL statement to create the products table.
pub const CREATE_PRODUCTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    part_number TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    price REAL,
    image_url TEXT,
    category TEXT,
    vendor_id TEXT REFERENCES vendors(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
)
";

/// Case-insensitive uniqueness for registrations in databases created
/// before the column carried `COLLATE NOCASE`.
pub const CREATE_AIRCRAFT_REGISTRATION_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_aircraft_registration
    ON aircraft(registration COLLATE NOCASE)
";

/// Index for listing an aircraft's sheets.
pub const CREATE_SHEETS_AIRCRAFT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sheets_aircraft ON maintenance_sheets(aircraft_id)
";

/// Index for loading a sheet's items in order.
pub const CREATE_ITEMS_SHEET_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_items_sheet ON maintenance_items(sheet_id, position)
";

/// Index for an aircraft's completion history.
pub const CREATE_RECORDS_AIRCRAFT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_aircraft ON maintenance_records(aircraft_id, completed_at DESC)
";

/// Index for part number lookups.
pub const CREATE_PRODUCTS_PART_NUMBER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_products_part_number ON products(part_number)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_AIRCRAFT_TABLE,
    CREATE_SHEETS_TABLE,
    CREATE_ITEMS_TABLE,
    CREATE_RECORDS_TABLE,
    CREATE_VENDORS_TABLE,
    CREATE_PRODUCTS_TABLE,
    CREATE_SHEETS_AIRCRAFT_INDEX,
    CREATE_ITEMS_SHEET_INDEX,
    CREATE_RECORDS_AIRCRAFT_INDEX,
    CREATE_PRODUCTS_PART_NUMBER_INDEX,
    CREATE_METADATA_TABLE,
];
