//! Administration (dose log) persistence.
//!
//! # Invariants
//! - A dose is only logged against an existing assignment.
//! - A caregiver, when given, must exist and be active at logging time.
//!   Corrections re-check only when the caregiver changes, so historical
//!   rows of since-deactivated caregivers stay editable.

use super::{
    ensure_connection_ready, millis_to_utc, parse_optional_uuid, parse_uuid, RepoError,
    RepoResult,
};
use crate::engine::lookup::AdministrationLookup;
use crate::model::administration::{
    Administration, AdministrationCorrection, AdministrationListQuery,
};
use crate::model::{AdministrationId, AssignmentId, CaregiverId};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const ADMINISTRATION_SELECT_SQL: &str = "SELECT
    uuid,
    assignment_uuid,
    caregiver_uuid,
    administered_at,
    dose_given,
    notes,
    created_at
FROM administrations";

/// Repository interface for administrations.
pub trait AdministrationRepository: AdministrationLookup<Error = RepoError> {
    fn create_administration(&self, administration: &Administration)
        -> RepoResult<AdministrationId>;
    /// Applies `correction` to the stored row and writes the result back.
    fn update_administration(
        &self,
        id: AdministrationId,
        correction: &AdministrationCorrection,
        now: DateTime<Utc>,
    ) -> RepoResult<Administration>;
    fn get_administration(&self, id: AdministrationId) -> RepoResult<Option<Administration>>;
    /// Lists administrations newest first.
    fn list_administrations(
        &self,
        query: &AdministrationListQuery,
    ) -> RepoResult<Vec<Administration>>;
    fn delete_administration(&self, id: AdministrationId) -> RepoResult<()>;
}

/// SQLite-backed administration repository.
pub struct SqliteAdministrationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAdministrationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AdministrationLookup for SqliteAdministrationRepository<'_> {
    type Error = RepoError;

    fn last_administered_at(
        &self,
        assignment_id: AssignmentId,
    ) -> RepoResult<Option<DateTime<Utc>>> {
        let latest: Option<i64> = self.conn.query_row(
            "SELECT MAX(administered_at) FROM administrations WHERE assignment_uuid = ?1;",
            [assignment_id.to_string()],
            |row| row.get(0),
        )?;
        latest
            .map(|millis| millis_to_utc(millis, "administrations.administered_at"))
            .transpose()
    }
}

impl AdministrationRepository for SqliteAdministrationRepository<'_> {
    fn create_administration(
        &self,
        administration: &Administration,
    ) -> RepoResult<AdministrationId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_assignment_exists(&tx, administration.assignment_id)?;
        if let Some(caregiver_id) = administration.caregiver_id {
            ensure_active_caregiver(&tx, caregiver_id)?;
        }

        tx.execute(
            "INSERT INTO administrations (
                uuid,
                assignment_uuid,
                caregiver_uuid,
                administered_at,
                dose_given,
                notes,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                administration.id.to_string(),
                administration.assignment_id.to_string(),
                administration.caregiver_id.map(|value| value.to_string()),
                administration.administered_at.timestamp_millis(),
                administration.dose_given.as_str(),
                administration.notes.as_deref(),
                administration.created_at.timestamp_millis(),
            ],
        )?;

        tx.commit()?;
        Ok(administration.id)
    }

    fn update_administration(
        &self,
        id: AdministrationId,
        correction: &AdministrationCorrection,
        now: DateTime<Utc>,
    ) -> RepoResult<Administration> {
        // Read under the write lock so concurrent corrections compose.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stored = select_administration(&tx, id)?.ok_or(RepoError::NotFound {
            entity: "administration",
            id,
        })?;
        let previous_caregiver = stored.caregiver_id;
        let administration = correction.apply(stored, now)?;

        if let Some(caregiver_id) = administration.caregiver_id {
            if previous_caregiver != Some(caregiver_id) {
                ensure_active_caregiver(&tx, caregiver_id)?;
            }
        }

        tx.execute(
            "UPDATE administrations
             SET
                caregiver_uuid = ?2,
                administered_at = ?3,
                dose_given = ?4,
                notes = ?5
             WHERE uuid = ?1;",
            params![
                administration.id.to_string(),
                administration.caregiver_id.map(|value| value.to_string()),
                administration.administered_at.timestamp_millis(),
                administration.dose_given.as_str(),
                administration.notes.as_deref(),
            ],
        )?;

        tx.commit()?;
        Ok(administration)
    }

    fn get_administration(&self, id: AdministrationId) -> RepoResult<Option<Administration>> {
        select_administration(self.conn, id)
    }

    fn list_administrations(
        &self,
        query: &AdministrationListQuery,
    ) -> RepoResult<Vec<Administration>> {
        let mut sql = format!("{ADMINISTRATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(assignment_id) = query.assignment_id {
            sql.push_str(" AND assignment_uuid = ?");
            bind_values.push(Value::Text(assignment_id.to_string()));
        }

        if let Some(family_member_id) = query.family_member_id {
            sql.push_str(
                " AND assignment_uuid IN (
                    SELECT uuid FROM medication_assignments WHERE family_member_uuid = ?
                )",
            );
            bind_values.push(Value::Text(family_member_id.to_string()));
        }

        if let Some(medication_id) = query.medication_id {
            sql.push_str(
                " AND assignment_uuid IN (
                    SELECT uuid FROM medication_assignments WHERE medication_uuid = ?
                )",
            );
            bind_values.push(Value::Text(medication_id.to_string()));
        }

        if let Some(since) = query.since {
            sql.push_str(" AND administered_at >= ?");
            bind_values.push(Value::Integer(since.timestamp_millis()));
        }

        if let Some(until) = query.until {
            sql.push_str(" AND administered_at <= ?");
            bind_values.push(Value::Integer(until.timestamp_millis()));
        }

        sql.push_str(" ORDER BY administered_at DESC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut administrations = Vec::new();
        while let Some(row) = rows.next()? {
            administrations.push(parse_administration_row(row)?);
        }

        Ok(administrations)
    }

    fn delete_administration(&self, id: AdministrationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM administrations WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "administration",
                id,
            });
        }
        Ok(())
    }
}

fn select_administration(
    conn: &Connection,
    id: AdministrationId,
) -> RepoResult<Option<Administration>> {
    let mut stmt = conn.prepare(&format!("{ADMINISTRATION_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_administration_row(row)?));
    }
    Ok(None)
}

fn ensure_assignment_exists(conn: &Connection, id: AssignmentId) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM medication_assignments WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(RepoError::NotFound {
            entity: "assignment",
            id,
        });
    }
    Ok(())
}

fn ensure_active_caregiver(conn: &Connection, id: CaregiverId) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM caregivers WHERE uuid = ?1 AND active = 1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(RepoError::NotFound {
            entity: "caregiver",
            id,
        });
    }
    Ok(())
}

fn parse_administration_row(row: &Row<'_>) -> RepoResult<Administration> {
    let uuid_text: String = row.get("uuid")?;
    let assignment_text: String = row.get("assignment_uuid")?;

    Ok(Administration {
        id: parse_uuid(&uuid_text, "administrations.uuid")?,
        assignment_id: parse_uuid(&assignment_text, "administrations.assignment_uuid")?,
        caregiver_id: parse_optional_uuid(
            row.get("caregiver_uuid")?,
            "administrations.caregiver_uuid",
        )?,
        administered_at: millis_to_utc(
            row.get("administered_at")?,
            "administrations.administered_at",
        )?,
        dose_given: row.get("dose_given")?,
        notes: row.get("notes")?,
        created_at: millis_to_utc(row.get("created_at")?, "administrations.created_at")?,
    })
}
