//! Schema history of the dose tracker database.
//!
//! Versions are mirrored to `PRAGMA user_version`. Pending steps run inside
//! one transaction, so a failed upgrade leaves the previous version intact.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

/// One named schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "assignment_audit",
        sql: include_str!("0002_assignment_audit.sql"),
    },
    Migration {
        version: 3,
        name: "audit_update_seq",
        sql: include_str!("0003_audit_update_seq.sql"),
    },
    Migration {
        version: 4,
        name: "medication_inventory",
        sql: include_str!("0004_medication_inventory.sql"),
    },
];

/// Tables the repositories read and write at the latest version.
const TRACKER_TABLES: &[&str] = &[
    "family_members",
    "caregivers",
    "medications",
    "medication_assignments",
    "administrations",
    "assignment_audit_logs",
    "medication_inventory",
];

/// What an `apply_migrations` call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    /// Names of the steps applied, oldest first. Empty when already current.
    pub applied: Vec<&'static str>,
}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Migrations this binary knows, oldest first.
pub fn migrations() -> &'static [Migration] {
    MIGRATIONS
}

/// Brings `conn` to the latest schema and checks the tracker tables exist.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationReport> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version)
        .collect();

    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for migration in &pending {
            tx.execute_batch(migration.sql)
                .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
                .map_err(|source| DbError::Migration {
                    version: migration.version,
                    name: migration.name,
                    source,
                })?;
            debug!(
                "event=db_migrate module=db status=ok version={} name={}",
                migration.version, migration.name
            );
        }
        tx.commit()?;
    }

    verify_tracker_tables(conn, latest)?;

    Ok(MigrationReport {
        from_version,
        to_version: latest,
        applied: pending.iter().map(|migration| migration.name).collect(),
    })
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

fn verify_tracker_tables(conn: &Connection, schema_version: u32) -> DbResult<()> {
    let mut stmt =
        conn.prepare("SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);")?;
    for &table in TRACKER_TABLES {
        let exists: bool = stmt.query_row([table], |row| row.get(0))?;
        if !exists {
            return Err(DbError::MissingTable {
                table,
                schema_version,
            });
        }
    }
    Ok(())
}
