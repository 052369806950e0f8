//! Medication catalog persistence.
//!
//! # Invariants
//! - Write paths call `Medication::validate()` before SQL mutations.
//! - Read paths do not re-validate the default frequency: a misconfigured
//!   legacy row must still load so readiness can report a configuration
//!   error instead of failing the whole read.

use super::{ensure_connection_ready, millis_to_utc, parse_uuid, RepoError, RepoResult};
use crate::engine::frequency::FrequencyFields;
use crate::model::medication::Medication;
use crate::model::MedicationId;
use rusqlite::{params, Connection, Row};

pub(crate) const MEDICATION_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    default_dose,
    default_frequency_hours,
    default_frequency_min_hours,
    default_frequency_max_hours,
    notes,
    created_at
FROM medications";

/// Repository interface for medications.
pub trait MedicationRepository {
    fn create_medication(&self, medication: &Medication) -> RepoResult<MedicationId>;
    fn update_medication(&self, medication: &Medication) -> RepoResult<()>;
    fn get_medication(&self, id: MedicationId) -> RepoResult<Option<Medication>>;
    /// Lists medications sorted by name.
    fn list_medications(&self) -> RepoResult<Vec<Medication>>;
}

/// SQLite-backed medication repository.
pub struct SqliteMedicationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMedicationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MedicationRepository for SqliteMedicationRepository<'_> {
    fn create_medication(&self, medication: &Medication) -> RepoResult<MedicationId> {
        medication.validate()?;

        self.conn.execute(
            "INSERT INTO medications (
                uuid,
                name,
                default_dose,
                default_frequency_hours,
                default_frequency_min_hours,
                default_frequency_max_hours,
                notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                medication.id.to_string(),
                medication.name.as_str(),
                medication.default_dose.as_str(),
                medication.default_frequency.hours,
                medication.default_frequency.min_hours,
                medication.default_frequency.max_hours,
                medication.notes.as_deref(),
                medication.created_at.timestamp_millis(),
            ],
        )?;

        Ok(medication.id)
    }

    fn update_medication(&self, medication: &Medication) -> RepoResult<()> {
        medication.validate()?;

        let changed = self.conn.execute(
            "UPDATE medications
             SET
                name = ?1,
                default_dose = ?2,
                default_frequency_hours = ?3,
                default_frequency_min_hours = ?4,
                default_frequency_max_hours = ?5,
                notes = ?6
             WHERE uuid = ?7;",
            params![
                medication.name.as_str(),
                medication.default_dose.as_str(),
                medication.default_frequency.hours,
                medication.default_frequency.min_hours,
                medication.default_frequency.max_hours,
                medication.notes.as_deref(),
                medication.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "medication",
                id: medication.id,
            });
        }

        Ok(())
    }

    fn get_medication(&self, id: MedicationId) -> RepoResult<Option<Medication>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEDICATION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_medication_row(row)?));
        }
        Ok(None)
    }

    fn list_medications(&self) -> RepoResult<Vec<Medication>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEDICATION_SELECT_SQL} ORDER BY name ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut medications = Vec::new();
        while let Some(row) = rows.next()? {
            medications.push(parse_medication_row(row)?);
        }
        Ok(medications)
    }
}

pub(crate) fn parse_medication_row(row: &Row<'_>) -> RepoResult<Medication> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Medication {
        id: parse_uuid(&uuid_text, "medications.uuid")?,
        name: row.get("name")?,
        default_dose: row.get("default_dose")?,
        default_frequency: FrequencyFields {
            hours: row.get("default_frequency_hours")?,
            min_hours: row.get("default_frequency_min_hours")?,
            max_hours: row.get("default_frequency_max_hours")?,
        },
        notes: row.get("notes")?,
        created_at: millis_to_utc(row.get("created_at")?, "medications.created_at")?,
    })
}
