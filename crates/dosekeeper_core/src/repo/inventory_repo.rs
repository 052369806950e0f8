//! Medication stock persistence.
//!
//! # Invariants
//! - `medication_inventory.medication_uuid` is unique: recording stock for
//!   a medication that already has a record rewrites that record.
//! - Edits read, patch and write inside one IMMEDIATE transaction.

use super::{ensure_connection_ready, millis_to_utc, parse_uuid, RepoError, RepoResult};
use crate::model::inventory::{InventoryLevel, InventoryPatch, MedicationInventory};
use crate::model::{InventoryId, MedicationId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const INVENTORY_SELECT_SQL: &str = "SELECT
    i.uuid,
    i.medication_uuid,
    i.quantity,
    i.unit,
    i.low_stock_threshold,
    i.last_updated
FROM medication_inventory i";

/// Repository interface for stock levels.
pub trait InventoryRepository {
    /// Creates or rewrites the stock record of `level.medication_id`.
    fn upsert_inventory(
        &self,
        level: &InventoryLevel,
        now: DateTime<Utc>,
    ) -> RepoResult<MedicationInventory>;
    fn get_inventory(&self, id: InventoryId) -> RepoResult<Option<MedicationInventory>>;
    fn get_inventory_for_medication(
        &self,
        medication_id: MedicationId,
    ) -> RepoResult<Option<MedicationInventory>>;
    fn update_inventory(
        &self,
        id: InventoryId,
        patch: &InventoryPatch,
        now: DateTime<Utc>,
    ) -> RepoResult<MedicationInventory>;
    /// Lists stock records by medication name.
    fn list_inventory(&self) -> RepoResult<Vec<MedicationInventory>>;
    /// Stock records at or below a positive threshold, by medication name.
    fn list_low_stock(&self) -> RepoResult<Vec<MedicationInventory>>;
    fn delete_inventory(&self, id: InventoryId) -> RepoResult<()>;
}

/// SQLite-backed stock repository.
pub struct SqliteInventoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInventoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_list(&self, filter: &str) -> RepoResult<Vec<MedicationInventory>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INVENTORY_SELECT_SQL}
             JOIN medications m ON m.uuid = i.medication_uuid
             {filter}
             ORDER BY m.name ASC, i.uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_inventory_row(row)?);
        }
        Ok(records)
    }
}

impl InventoryRepository for SqliteInventoryRepository<'_> {
    fn upsert_inventory(
        &self,
        level: &InventoryLevel,
        now: DateTime<Utc>,
    ) -> RepoResult<MedicationInventory> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_medication_exists(&tx, level.medication_id)?;

        let existing = select_by_medication(&tx, level.medication_id)?;
        let record = MedicationInventory {
            id: existing
                .as_ref()
                .map_or_else(Uuid::new_v4, |stored| stored.id),
            medication_id: level.medication_id,
            quantity: level.quantity,
            unit: level.unit.clone(),
            low_stock_threshold: level.low_stock_threshold,
            last_updated: now,
        };
        record.validate()?;

        if existing.is_some() {
            write_levels(&tx, &record)?;
        } else {
            tx.execute(
                "INSERT INTO medication_inventory (
                    uuid,
                    medication_uuid,
                    quantity,
                    unit,
                    low_stock_threshold,
                    last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    record.id.to_string(),
                    record.medication_id.to_string(),
                    record.quantity,
                    record.unit.as_str(),
                    record.low_stock_threshold,
                    record.last_updated.timestamp_millis(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(record)
    }

    fn get_inventory(&self, id: InventoryId) -> RepoResult<Option<MedicationInventory>> {
        select_one(self.conn, "i.uuid", id)
    }

    fn get_inventory_for_medication(
        &self,
        medication_id: MedicationId,
    ) -> RepoResult<Option<MedicationInventory>> {
        select_by_medication(self.conn, medication_id)
    }

    fn update_inventory(
        &self,
        id: InventoryId,
        patch: &InventoryPatch,
        now: DateTime<Utc>,
    ) -> RepoResult<MedicationInventory> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stored = select_one(&tx, "i.uuid", id)?.ok_or(RepoError::NotFound {
            entity: "inventory",
            id,
        })?;

        let record = patch.apply(stored, now)?;
        write_levels(&tx, &record)?;

        tx.commit()?;
        Ok(record)
    }

    fn list_inventory(&self) -> RepoResult<Vec<MedicationInventory>> {
        self.query_list("")
    }

    fn list_low_stock(&self) -> RepoResult<Vec<MedicationInventory>> {
        self.query_list(
            "WHERE i.low_stock_threshold > 0 AND i.quantity <= i.low_stock_threshold",
        )
    }

    fn delete_inventory(&self, id: InventoryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM medication_inventory WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "inventory",
                id,
            });
        }
        Ok(())
    }
}

fn select_one(
    conn: &Connection,
    column: &str,
    id: Uuid,
) -> RepoResult<Option<MedicationInventory>> {
    let mut stmt = conn.prepare(&format!("{INVENTORY_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_inventory_row(row)?));
    }
    Ok(None)
}

fn select_by_medication(
    conn: &Connection,
    medication_id: MedicationId,
) -> RepoResult<Option<MedicationInventory>> {
    select_one(conn, "i.medication_uuid", medication_id)
}

fn write_levels(conn: &Connection, record: &MedicationInventory) -> RepoResult<()> {
    conn.execute(
        "UPDATE medication_inventory
         SET
            quantity = ?2,
            unit = ?3,
            low_stock_threshold = ?4,
            last_updated = ?5
         WHERE uuid = ?1;",
        params![
            record.id.to_string(),
            record.quantity,
            record.unit.as_str(),
            record.low_stock_threshold,
            record.last_updated.timestamp_millis(),
        ],
    )?;
    Ok(())
}

fn ensure_medication_exists(conn: &Connection, id: MedicationId) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM medications WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(RepoError::NotFound {
            entity: "medication",
            id,
        });
    }
    Ok(())
}

fn parse_inventory_row(row: &Row<'_>) -> RepoResult<MedicationInventory> {
    let uuid_text: String = row.get("uuid")?;
    let medication_text: String = row.get("medication_uuid")?;

    Ok(MedicationInventory {
        id: parse_uuid(&uuid_text, "medication_inventory.uuid")?,
        medication_id: parse_uuid(&medication_text, "medication_inventory.medication_uuid")?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        low_stock_threshold: row.get("low_stock_threshold")?,
        last_updated: millis_to_utc(
            row.get("last_updated")?,
            "medication_inventory.last_updated",
        )?,
    })
}
