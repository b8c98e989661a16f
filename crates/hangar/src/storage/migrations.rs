//! Schema versioning for hangar databases.
//!
//! The version lives under `schema_version` in the `metadata` table. Each
//! entry in [`MIGRATIONS`] lifts a database by one version and commits
//! together with the new version number.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_AIRCRAFT_REGISTRATION_INDEX, SCHEMA_STATEMENTS};

/// The schema version this build reads and writes.
pub const CURRENT_VERSION: i32 = 2;

const VERSION_KEY: &str = "schema_version";

type Migration = fn(&Connection) -> Result<()>;

/// Entry `n` brings a database from version `n` to `n + 1`.
const MIGRATIONS: &[Migration] = &[migrate_v1, migrate_v2];

/// Create missing tables, then upgrade the database to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if a statement or migration fails, or if the database
/// was written by a newer hangar.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(migration_error(format!(
            "database schema version {version} is newer than supported version {CURRENT_VERSION}"
        )));
    }
    for target in version + 1..=CURRENT_VERSION {
        apply_migration(conn, target)?;
    }
    Ok(())
}

/// The stored schema version, or 0 for a database that has none yet.
fn schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    stored.map_or(Ok(0), |value| {
        value
            .parse()
            .map_err(|_| migration_error(format!("invalid schema version: {value}")))
    })
}

fn store_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO metadata (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        ",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run the migration that produces `target` and record the new version.
fn apply_migration(conn: &Connection, target: i32) -> Result<()> {
    let migration = usize::try_from(target - 1)
        .ok()
        .and_then(|index| MIGRATIONS.get(index).copied())
        .ok_or_else(|| migration_error(format!("unknown migration version: {target}")))?;

    let tx = conn.unchecked_transaction()?;
    migration(&tx)?;
    store_version(&tx, target)?;
    tx.commit()?;
    info!("Migrated database schema to version {target}");
    Ok(())
}

fn migration_error(message: String) -> Error {
    Error::DatabaseMigration { message }
}

/// Base tables come from `SCHEMA_STATEMENTS`.
fn migrate_v1(_conn: &Connection) -> Result<()> {
    Ok(())
}

/// Registrations are unique ignoring case.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_AIRCRAFT_REGISTRATION_INDEX, [])
        .map_err(|e| migration_error(format!("registration index: {e}")))?;
    Ok(())
}
