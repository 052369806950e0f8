use chrono::{DateTime, TimeZone, Utc};
use dosekeeper_core::db::open_db_in_memory;
use dosekeeper_core::engine::lookup::AssignmentIdentityLookup;
use dosekeeper_core::{
    AssignmentFields, AssignmentIdentity, AssignmentService, CatalogService, EngineError,
    FamilyMember, FixedClock, FrequencyFields, Medication, NewMedication, RepoError,
    SqliteAdministrationRepository, SqliteAssignmentRepository, SqliteHouseholdRepository,
    SqliteMedicationRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn catalog(
    conn: &Connection,
) -> CatalogService<SqliteMedicationRepository<'_>, SqliteHouseholdRepository<'_>, FixedClock> {
    CatalogService::new(
        SqliteMedicationRepository::try_new(conn).unwrap(),
        SqliteHouseholdRepository::try_new(conn).unwrap(),
        FixedClock(now()),
    )
}

fn assignments(
    conn: &Connection,
) -> AssignmentService<
    SqliteAssignmentRepository<'_>,
    SqliteAdministrationRepository<'_>,
    FixedClock,
> {
    AssignmentService::new(
        SqliteAssignmentRepository::try_new(conn).unwrap(),
        SqliteAdministrationRepository::try_new(conn).unwrap(),
        FixedClock(now()),
    )
}

fn seed(conn: &Connection) -> (FamilyMember, Medication) {
    let catalog = catalog(conn);
    let member = catalog.add_family_member("Mia").unwrap();
    let medication = catalog
        .add_medication(NewMedication {
            name: "Ibuprofen".to_string(),
            default_dose: "5mL".to_string(),
            default_frequency: FrequencyFields::range(6.0, 8.0),
            notes: Some("with food".to_string()),
        })
        .unwrap();
    (member, medication)
}

fn assignment_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM medication_assignments;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn duplicate_active_assignment_is_rejected_with_details() {
    let conn = open_db_in_memory().unwrap();
    let (member, medication) = seed(&conn);
    let service = assignments(&conn);

    let existing = service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap();
    let err = service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap_err();

    let RepoError::Engine(EngineError::Conflict(conflict)) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(conflict.existing_assignment_id, existing.id);
    assert!(conflict.is_active);
    assert_eq!(conflict.family_member_name, "Mia");
    assert_eq!(conflict.medication_name, "Ibuprofen");
    assert_eq!(err.code(), "conflict");
    assert_eq!(assignment_count(&conn), 1);
}

#[test]
fn inactive_assignment_still_blocks_creation() {
    let conn = open_db_in_memory().unwrap();
    let (member, medication) = seed(&conn);
    let service = assignments(&conn);

    let existing = service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap();
    service.deactivate_assignment(existing.id).unwrap();

    let err = service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap_err();
    let RepoError::Engine(EngineError::Conflict(conflict)) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(!conflict.is_active);
    assert!(conflict.message().contains("reactivate"));
    assert_eq!(conflict.existing_assignment_id, existing.id);
}

#[test]
fn identity_lookup_finds_rows_regardless_of_active_flag() {
    let conn = open_db_in_memory().unwrap();
    let (member, medication) = seed(&conn);
    let service = assignments(&conn);
    let repo = SqliteAssignmentRepository::try_new(&conn).unwrap();
    let identity = AssignmentIdentity {
        family_member_id: member.id,
        medication_id: medication.id,
    };

    assert!(repo.find_by_identity(&identity).unwrap().is_none());

    let created = service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap();
    service.deactivate_assignment(created.id).unwrap();

    let found = repo.find_by_identity(&identity).unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert!(!found.active);
}

#[test]
fn same_medication_for_another_family_member_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let (member, medication) = seed(&conn);
    let sibling = catalog(&conn).add_family_member("Leo").unwrap();
    let service = assignments(&conn);

    service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap();
    service
        .create_assignment(sibling.id, medication.id, AssignmentFields::default())
        .unwrap();

    assert_eq!(assignment_count(&conn), 2);
}

#[test]
fn inactive_family_member_and_missing_medication_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let (member, medication) = seed(&conn);
    let service = assignments(&conn);

    let missing = Uuid::new_v4();
    let err = service
        .create_assignment(member.id, missing, AssignmentFields::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "medication", id } if id == missing));

    catalog(&conn)
        .set_family_member_active(member.id, false)
        .unwrap();
    let err = service
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "family_member", .. }));
    assert_eq!(assignment_count(&conn), 0);
}

#[test]
fn invalid_override_is_rejected_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let (member, medication) = seed(&conn);
    let service = assignments(&conn);

    let err = service
        .create_assignment(
            member.id,
            medication.id,
            AssignmentFields {
                frequency_min_hours: Some(8.0),
                frequency_max_hours: Some(4.0),
                ..AssignmentFields::default()
            },
        )
        .unwrap_err();

    assert_eq!(err.code(), "validation_error");
    assert_eq!(assignment_count(&conn), 0);
}
