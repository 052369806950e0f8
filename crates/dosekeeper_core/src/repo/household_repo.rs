//! Family member and caregiver persistence.
//!
//! Both tables share one shape (`uuid`, `name`, `active`, `created_at`), so
//! the SQL helpers here are parameterized by table.

use super::{
    bool_to_int, ensure_connection_ready, int_to_bool, millis_to_utc, parse_uuid, RepoError,
    RepoResult,
};
use crate::model::household::{Caregiver, FamilyMember};
use crate::model::{CaregiverId, FamilyMemberId};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const FAMILY_MEMBERS: &str = "family_members";
const CAREGIVERS: &str = "caregivers";

/// Repository interface for household records.
pub trait HouseholdRepository {
    fn create_family_member(&self, member: &FamilyMember) -> RepoResult<FamilyMemberId>;
    fn get_family_member(&self, id: FamilyMemberId) -> RepoResult<Option<FamilyMember>>;
    fn set_family_member_active(&self, id: FamilyMemberId, active: bool) -> RepoResult<()>;
    fn rename_family_member(&self, id: FamilyMemberId, name: &str) -> RepoResult<()>;
    /// Lists family members by name; `None` includes inactive rows.
    fn list_family_members(&self, active: Option<bool>) -> RepoResult<Vec<FamilyMember>>;
    fn create_caregiver(&self, caregiver: &Caregiver) -> RepoResult<CaregiverId>;
    fn get_caregiver(&self, id: CaregiverId) -> RepoResult<Option<Caregiver>>;
    fn set_caregiver_active(&self, id: CaregiverId, active: bool) -> RepoResult<()>;
    fn rename_caregiver(&self, id: CaregiverId, name: &str) -> RepoResult<()>;
    /// Lists caregivers by name; `None` includes inactive rows.
    fn list_caregivers(&self, active: Option<bool>) -> RepoResult<Vec<Caregiver>>;
}

/// SQLite-backed household repository.
pub struct SqliteHouseholdRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHouseholdRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

struct PersonRow {
    id: Uuid,
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<PersonRow> for FamilyMember {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

impl From<PersonRow> for Caregiver {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

impl HouseholdRepository for SqliteHouseholdRepository<'_> {
    fn create_family_member(&self, member: &FamilyMember) -> RepoResult<FamilyMemberId> {
        insert_person(
            self.conn,
            FAMILY_MEMBERS,
            member.id,
            &member.name,
            member.active,
            member.created_at,
        )?;
        Ok(member.id)
    }

    fn get_family_member(&self, id: FamilyMemberId) -> RepoResult<Option<FamilyMember>> {
        Ok(select_person(self.conn, FAMILY_MEMBERS, id)?.map(FamilyMember::from))
    }

    fn set_family_member_active(&self, id: FamilyMemberId, active: bool) -> RepoResult<()> {
        set_person_active(self.conn, FAMILY_MEMBERS, "family_member", id, active)
    }

    fn rename_family_member(&self, id: FamilyMemberId, name: &str) -> RepoResult<()> {
        rename_person(self.conn, FAMILY_MEMBERS, "family_member", id, name)
    }

    fn list_family_members(&self, active: Option<bool>) -> RepoResult<Vec<FamilyMember>> {
        let rows = list_people(self.conn, FAMILY_MEMBERS, active)?;
        Ok(rows.into_iter().map(FamilyMember::from).collect())
    }

    fn create_caregiver(&self, caregiver: &Caregiver) -> RepoResult<CaregiverId> {
        insert_person(
            self.conn,
            CAREGIVERS,
            caregiver.id,
            &caregiver.name,
            caregiver.active,
            caregiver.created_at,
        )?;
        Ok(caregiver.id)
    }

    fn get_caregiver(&self, id: CaregiverId) -> RepoResult<Option<Caregiver>> {
        Ok(select_person(self.conn, CAREGIVERS, id)?.map(Caregiver::from))
    }

    fn set_caregiver_active(&self, id: CaregiverId, active: bool) -> RepoResult<()> {
        set_person_active(self.conn, CAREGIVERS, "caregiver", id, active)
    }

    fn rename_caregiver(&self, id: CaregiverId, name: &str) -> RepoResult<()> {
        rename_person(self.conn, CAREGIVERS, "caregiver", id, name)
    }

    fn list_caregivers(&self, active: Option<bool>) -> RepoResult<Vec<Caregiver>> {
        let rows = list_people(self.conn, CAREGIVERS, active)?;
        Ok(rows.into_iter().map(Caregiver::from).collect())
    }
}

fn insert_person(
    conn: &Connection,
    table: &str,
    id: Uuid,
    name: &str,
    active: bool,
    created_at: DateTime<Utc>,
) -> RepoResult<()> {
    conn.execute(
        &format!("INSERT INTO {table} (uuid, name, active, created_at) VALUES (?1, ?2, ?3, ?4);"),
        params![
            id.to_string(),
            name,
            bool_to_int(active),
            created_at.timestamp_millis()
        ],
    )?;
    Ok(())
}

fn select_person(conn: &Connection, table: &str, id: Uuid) -> RepoResult<Option<PersonRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT uuid, name, active, created_at FROM {table} WHERE uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_person_row(row, table)?));
    }
    Ok(None)
}

fn list_people(conn: &Connection, table: &str, active: Option<bool>) -> RepoResult<Vec<PersonRow>> {
    let mut sql = format!("SELECT uuid, name, active, created_at FROM {table}");
    let mut bind_values: Vec<Value> = Vec::new();
    if let Some(active) = active {
        sql.push_str(" WHERE active = ?");
        bind_values.push(Value::Integer(bool_to_int(active)));
    }
    sql.push_str(" ORDER BY name ASC, uuid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut people = Vec::new();
    while let Some(row) = rows.next()? {
        people.push(parse_person_row(row, table)?);
    }
    Ok(people)
}

fn parse_person_row(row: &Row<'_>, table: &str) -> RepoResult<PersonRow> {
    let uuid_text: String = row.get("uuid")?;
    Ok(PersonRow {
        id: parse_uuid(&uuid_text, &format!("{table}.uuid"))?,
        name: row.get("name")?,
        active: int_to_bool(row.get("active")?, &format!("{table}.active"))?,
        created_at: millis_to_utc(row.get("created_at")?, &format!("{table}.created_at"))?,
    })
}

fn rename_person(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: Uuid,
    name: &str,
) -> RepoResult<()> {
    let changed = conn.execute(
        &format!("UPDATE {table} SET name = ?1 WHERE uuid = ?2;"),
        params![name, id.to_string()],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn set_person_active(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: Uuid,
    active: bool,
) -> RepoResult<()> {
    let changed = conn.execute(
        &format!("UPDATE {table} SET active = ?1 WHERE uuid = ?2;"),
        params![bool_to_int(active), id.to_string()],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}
