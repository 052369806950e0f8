//! Assignment persistence with conflict guard and audited updates.
//!
//! # Responsibility
//! - Create assignments only when no row holds the same identity pair.
//! - Apply sparse patches and append audit rows in the same transaction.
//! - Serve the identity lookup used by the conflict guard.
//!
//! # Invariants
//! - Creation and update each run inside one `IMMEDIATE` transaction, so
//!   the conflict check and the insert see the same state.
//! - An update that changes nothing writes nothing, not even `updated_at`.
//! - Audit rows are never updated or deleted.

use super::medication_repo::{parse_medication_row, MEDICATION_SELECT_SQL};
use super::{
    bool_to_int, ensure_connection_ready, int_to_bool, millis_to_utc, optional_millis_to_utc,
    parse_uuid, RepoError, RepoResult,
};
use crate::engine::audit::{diff_for_audit, AuditEntry};
use crate::engine::conflict::{check_assignment_conflict, ExistingAssignment};
use crate::engine::lookup::AssignmentIdentityLookup;
use crate::model::assignment::{
    Assignment, AssignmentFields, AssignmentIdentity, AssignmentPatch,
};
use crate::model::medication::Medication;
use crate::model::{AssignmentId, FamilyMemberId};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    uuid,
    family_member_uuid,
    medication_uuid,
    current_dose,
    frequency_hours,
    frequency_min_hours,
    frequency_max_hours,
    active,
    schedule_type,
    schedule_time,
    schedule_days,
    created_at,
    updated_at
FROM medication_assignments";

/// Listing filter for assignments.
#[derive(Debug, Clone, Default)]
pub struct AssignmentListQuery {
    pub family_member_id: Option<FamilyMemberId>,
    /// `None` lists active and inactive rows.
    pub active: Option<bool>,
    /// Only rows with a `schedule_type`.
    pub scheduled_only: bool,
}

/// Assignment joined with what readiness and display need.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDetail {
    pub assignment: Assignment,
    pub family_member_name: String,
    pub medication: Medication,
}

/// Result of an audited update.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditedUpdate {
    pub assignment: Assignment,
    /// Empty when the patch changed nothing.
    pub entries: Vec<AuditEntry>,
}

/// Repository interface for assignments and their edit history.
pub trait AssignmentRepository: AssignmentIdentityLookup<Error = RepoError> {
    /// Inserts a new assignment.
    ///
    /// Fails with `NotFound` when the family member is missing or inactive,
    /// or when the medication is missing, and with a conflict error when any
    /// assignment already exists for the identity pair.
    fn create_assignment(&self, assignment: &Assignment) -> RepoResult<AssignmentId>;
    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>>;
    fn get_assignment_detail(&self, id: AssignmentId) -> RepoResult<Option<AssignmentDetail>>;
    /// Lists assignments ordered by creation time.
    fn list_assignments(&self, query: &AssignmentListQuery) -> RepoResult<Vec<Assignment>>;
    /// Applies `patch` and appends one audit row per changed field.
    fn update_assignment(
        &self,
        id: AssignmentId,
        patch: &AssignmentPatch,
        changed_at: DateTime<Utc>,
    ) -> RepoResult<AuditedUpdate>;
    /// Audit history, newest first; entries of one update keep field order.
    fn list_audit_entries(&self, id: AssignmentId) -> RepoResult<Vec<AuditEntry>>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AssignmentIdentityLookup for SqliteAssignmentRepository<'_> {
    type Error = RepoError;

    fn find_by_identity(
        &self,
        identity: &AssignmentIdentity,
    ) -> RepoResult<Option<ExistingAssignment>> {
        find_existing(self.conn, identity)
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn create_assignment(&self, assignment: &Assignment) -> RepoResult<AssignmentId> {
        assignment.fields.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_active_family_member(&tx, assignment.family_member_id)?;
        ensure_medication_exists(&tx, assignment)?;

        let identity = assignment.identity();
        let existing = find_existing(&tx, &identity)?;
        check_assignment_conflict(&identity, |_| existing)?;

        let fields = &assignment.fields;
        tx.execute(
            "INSERT INTO medication_assignments (
                uuid,
                family_member_uuid,
                medication_uuid,
                current_dose,
                frequency_hours,
                frequency_min_hours,
                frequency_max_hours,
                active,
                schedule_type,
                schedule_time,
                schedule_days,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                assignment.id.to_string(),
                assignment.family_member_id.to_string(),
                assignment.medication_id.to_string(),
                fields.current_dose.as_deref(),
                fields.frequency_hours,
                fields.frequency_min_hours,
                fields.frequency_max_hours,
                bool_to_int(fields.active),
                fields.schedule_type.as_deref(),
                fields.schedule_time.as_deref(),
                fields.schedule_days.as_deref(),
                assignment.created_at.timestamp_millis(),
                assignment.updated_at.map(|value| value.timestamp_millis()),
            ],
        )?;

        tx.commit()?;
        Ok(assignment.id)
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        select_assignment(self.conn, id)
    }

    fn get_assignment_detail(&self, id: AssignmentId) -> RepoResult<Option<AssignmentDetail>> {
        let Some(assignment) = select_assignment(self.conn, id)? else {
            return Ok(None);
        };

        let family_member_name: String = self
            .conn
            .query_row(
                "SELECT name FROM family_members WHERE uuid = ?1;",
                [assignment.family_member_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "assignment {} references missing family member",
                    assignment.id
                ))
            })?;

        let mut stmt = self
            .conn
            .prepare(&format!("{MEDICATION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([assignment.medication_id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::InvalidData(format!(
                "assignment {} references missing medication",
                assignment.id
            )));
        };
        let medication = parse_medication_row(row)?;

        Ok(Some(AssignmentDetail {
            assignment,
            family_member_name,
            medication,
        }))
    }

    fn list_assignments(&self, query: &AssignmentListQuery) -> RepoResult<Vec<Assignment>> {
        let mut sql = format!("{ASSIGNMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(family_member_id) = query.family_member_id {
            sql.push_str(" AND family_member_uuid = ?");
            bind_values.push(Value::Text(family_member_id.to_string()));
        }

        if let Some(active) = query.active {
            sql.push_str(" AND active = ?");
            bind_values.push(Value::Integer(bool_to_int(active)));
        }

        if query.scheduled_only {
            sql.push_str(" AND schedule_type IS NOT NULL");
        }

        sql.push_str(" ORDER BY created_at ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }

        Ok(assignments)
    }

    fn update_assignment(
        &self,
        id: AssignmentId,
        patch: &AssignmentPatch,
        changed_at: DateTime<Utc>,
    ) -> RepoResult<AuditedUpdate> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = select_assignment(&tx, id)?.ok_or(RepoError::NotFound {
            entity: "assignment",
            id,
        })?;

        let (fields, entries) = diff_for_audit(&current.fields, patch, changed_at)?;
        if entries.is_empty() {
            tx.commit()?;
            return Ok(AuditedUpdate {
                assignment: current,
                entries,
            });
        }

        write_fields(&tx, id, &fields, changed_at)?;
        // Taken under the write lock, so concurrent updates get distinct values.
        let update_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(update_seq), 0) + 1
             FROM assignment_audit_logs
             WHERE assignment_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        for entry in &entries {
            tx.execute(
                "INSERT INTO assignment_audit_logs (
                    assignment_uuid,
                    field_name,
                    old_value,
                    new_value,
                    changed_at,
                    update_seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    id.to_string(),
                    entry.field_name.as_str(),
                    entry.old_value.as_deref(),
                    entry.new_value.as_deref(),
                    entry.changed_at.timestamp_millis(),
                    update_seq,
                ],
            )?;
        }
        tx.commit()?;

        Ok(AuditedUpdate {
            assignment: Assignment {
                fields,
                updated_at: Some(changed_at),
                ..current
            },
            entries,
        })
    }

    fn list_audit_entries(&self, id: AssignmentId) -> RepoResult<Vec<AuditEntry>> {
        if select_assignment(self.conn, id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "assignment",
                id,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT field_name, old_value, new_value, changed_at
             FROM assignment_audit_logs
             WHERE assignment_uuid = ?1
             ORDER BY changed_at DESC, update_seq DESC, id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(AuditEntry {
                field_name: row.get(0)?,
                old_value: row.get(1)?,
                new_value: row.get(2)?,
                changed_at: millis_to_utc(row.get(3)?, "assignment_audit_logs.changed_at")?,
            });
        }

        Ok(entries)
    }
}

fn select_assignment(conn: &Connection, id: AssignmentId) -> RepoResult<Option<Assignment>> {
    let mut stmt = conn.prepare(&format!("{ASSIGNMENT_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_assignment_row(row)?));
    }
    Ok(None)
}

fn find_existing(
    conn: &Connection,
    identity: &AssignmentIdentity,
) -> RepoResult<Option<ExistingAssignment>> {
    let raw = conn
        .query_row(
            "SELECT a.uuid, a.active, f.name, m.name
             FROM medication_assignments a
             JOIN family_members f ON f.uuid = a.family_member_uuid
             JOIN medications m ON m.uuid = a.medication_uuid
             WHERE a.family_member_uuid = ?1
               AND a.medication_uuid = ?2
             LIMIT 1;",
            params![
                identity.family_member_id.to_string(),
                identity.medication_id.to_string(),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((uuid_text, active, family_member_name, medication_name)) = raw else {
        return Ok(None);
    };

    Ok(Some(ExistingAssignment {
        id: parse_uuid(&uuid_text, "medication_assignments.uuid")?,
        active: int_to_bool(active, "medication_assignments.active")?,
        family_member_name,
        medication_name,
    }))
}

fn ensure_active_family_member(conn: &Connection, id: FamilyMemberId) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM family_members WHERE uuid = ?1 AND active = 1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(RepoError::NotFound {
            entity: "family_member",
            id,
        });
    }
    Ok(())
}

fn ensure_medication_exists(conn: &Connection, assignment: &Assignment) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM medications WHERE uuid = ?1;",
            [assignment.medication_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(RepoError::NotFound {
            entity: "medication",
            id: assignment.medication_id,
        });
    }
    Ok(())
}

fn write_fields(
    conn: &Connection,
    id: AssignmentId,
    fields: &AssignmentFields,
    changed_at: DateTime<Utc>,
) -> RepoResult<()> {
    conn.execute(
        "UPDATE medication_assignments
         SET
            current_dose = ?2,
            frequency_hours = ?3,
            frequency_min_hours = ?4,
            frequency_max_hours = ?5,
            active = ?6,
            schedule_type = ?7,
            schedule_time = ?8,
            schedule_days = ?9,
            updated_at = ?10
         WHERE uuid = ?1;",
        params![
            id.to_string(),
            fields.current_dose.as_deref(),
            fields.frequency_hours,
            fields.frequency_min_hours,
            fields.frequency_max_hours,
            bool_to_int(fields.active),
            fields.schedule_type.as_deref(),
            fields.schedule_time.as_deref(),
            fields.schedule_days.as_deref(),
            changed_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let uuid_text: String = row.get("uuid")?;
    let family_member_text: String = row.get("family_member_uuid")?;
    let medication_text: String = row.get("medication_uuid")?;

    Ok(Assignment {
        id: parse_uuid(&uuid_text, "medication_assignments.uuid")?,
        family_member_id: parse_uuid(
            &family_member_text,
            "medication_assignments.family_member_uuid",
        )?,
        medication_id: parse_uuid(&medication_text, "medication_assignments.medication_uuid")?,
        fields: AssignmentFields {
            current_dose: row.get("current_dose")?,
            frequency_hours: row.get("frequency_hours")?,
            frequency_min_hours: row.get("frequency_min_hours")?,
            frequency_max_hours: row.get("frequency_max_hours")?,
            active: int_to_bool(row.get("active")?, "medication_assignments.active")?,
            schedule_type: row.get("schedule_type")?,
            schedule_time: row.get("schedule_time")?,
            schedule_days: row.get("schedule_days")?,
        },
        created_at: millis_to_utc(row.get("created_at")?, "medication_assignments.created_at")?,
        updated_at: optional_millis_to_utc(
            row.get("updated_at")?,
            "medication_assignments.updated_at",
        )?,
    })
}
