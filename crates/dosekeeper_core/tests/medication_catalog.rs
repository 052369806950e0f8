use chrono::{DateTime, Duration, TimeZone, Utc};
use dosekeeper_core::db::open_db_in_memory;
use dosekeeper_core::{
    AdministrationService, AssignmentFields, AssignmentService, CatalogService, EngineError,
    FixedClock, FrequencyFields, Medication, NewAdministration, NewMedication, ReadinessState,
    RepoError, SqliteAdministrationRepository, SqliteAssignmentRepository,
    SqliteHouseholdRepository, SqliteMedicationRepository, ValidationError,
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

fn add_medication(conn: &Connection, name: &str, default_frequency: FrequencyFields) -> Medication {
    catalog(conn)
        .add_medication(NewMedication {
            name: name.to_string(),
            default_dose: "5mL".to_string(),
            default_frequency,
            notes: None,
        })
        .unwrap()
}

fn validation_error(err: &RepoError) -> Option<&ValidationError> {
    match err {
        RepoError::Engine(EngineError::Validation(inner)) => Some(inner),
        _ => None,
    }
}

#[test]
fn update_introducing_both_frequency_kinds_is_rejected_and_row_is_kept() {
    let conn = open_db_in_memory().unwrap();
    let medication = add_medication(&conn, "Amoxicillin", FrequencyFields::fixed(8.0));
    let catalog = catalog(&conn);

    let mut edited = medication.clone();
    edited.default_frequency.min_hours = Some(6.0);
    edited.default_frequency.max_hours = Some(8.0);
    edited.notes = Some("finish the course".to_string());

    let err = catalog.update_medication(&edited).unwrap_err();
    assert_eq!(
        validation_error(&err),
        Some(&ValidationError::BothFrequencies)
    );
    assert_eq!(
        catalog.get_medication(medication.id).unwrap().unwrap(),
        medication
    );
}

#[test]
fn update_rewrites_fields_and_unknown_medication_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let medication = add_medication(&conn, "Amoxicillin", FrequencyFields::fixed(8.0));
    let catalog = catalog(&conn);

    let edited = Medication {
        name: "Amoxicillin 250".to_string(),
        default_dose: "7.5mL".to_string(),
        default_frequency: FrequencyFields::range(6.0, 8.0),
        notes: Some("with food".to_string()),
        ..medication.clone()
    };
    catalog.update_medication(&edited).unwrap();
    assert_eq!(catalog.get_medication(medication.id).unwrap().unwrap(), edited);

    let missing = Medication {
        id: Uuid::new_v4(),
        ..edited
    };
    let err = catalog.update_medication(&missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "medication", .. }));
}

#[test]
fn list_medications_is_sorted_by_name() {
    let conn = open_db_in_memory().unwrap();
    add_medication(&conn, "Paracetamol", FrequencyFields::fixed(4.0));
    add_medication(&conn, "Cetirizine", FrequencyFields::fixed(24.0));
    add_medication(&conn, "Ibuprofen", FrequencyFields::range(6.0, 8.0));

    let names: Vec<_> = catalog(&conn)
        .list_medications()
        .unwrap()
        .into_iter()
        .map(|medication| medication.name)
        .collect();
    assert_eq!(names, vec!["Cetirizine", "Ibuprofen", "Paracetamol"]);
}

#[test]
fn default_frequency_change_reaches_inheriting_assignments() {
    let conn = open_db_in_memory().unwrap();
    let medication = add_medication(&conn, "Amoxicillin", FrequencyFields::fixed(8.0));
    let catalog = catalog(&conn);
    let member = catalog.add_family_member("Mia").unwrap();

    let assignments = AssignmentService::new(
        SqliteAssignmentRepository::try_new(&conn).unwrap(),
        SqliteAdministrationRepository::try_new(&conn).unwrap(),
        FixedClock(now()),
    );
    let assignment = assignments
        .create_assignment(member.id, medication.id, AssignmentFields::default())
        .unwrap();

    let last = now() - Duration::hours(3);
    AdministrationService::new(
        SqliteAdministrationRepository::try_new(&conn).unwrap(),
        FixedClock(now()),
    )
    .log_dose(NewAdministration {
        assignment_id: assignment.id,
        caregiver_id: None,
        administered_at: Some(last.into()),
        dose_given: "5mL".to_string(),
        notes: None,
    })
    .unwrap();

    let before = assignments.assignment_status(assignment.id).unwrap();
    assert!(!before.readiness.can_administer);
    assert_eq!(before.readiness.next_dose_time, Some(last + Duration::hours(8)));

    catalog
        .update_medication(&Medication {
            default_frequency: FrequencyFields::fixed(2.0),
            ..medication
        })
        .unwrap();

    let after = assignments.assignment_status(assignment.id).unwrap();
    assert_eq!(after.readiness.state, ReadinessState::Ready);
    assert!(after.readiness.can_administer);
    assert_eq!(after.readiness.next_dose_time, Some(last + Duration::hours(2)));
}

#[test]
fn household_members_can_be_renamed_and_listed() {
    let conn = open_db_in_memory().unwrap();
    let catalog = catalog(&conn);
    let mia = catalog.add_family_member("Mia").unwrap();
    let leo = catalog.add_family_member("Leo").unwrap();
    let ana = catalog.add_family_member("Ana").unwrap();
    catalog.set_family_member_active(ana.id, false).unwrap();

    let renamed = catalog.rename_family_member(mia.id, "Amelia").unwrap();
    assert_eq!(renamed.name, "Amelia");
    assert_eq!(renamed.created_at, mia.created_at);

    let listed: Vec<_> = catalog
        .list_family_members()
        .unwrap()
        .into_iter()
        .map(|member| member.id)
        .collect();
    assert_eq!(listed, vec![mia.id, leo.id]);

    let err = catalog.rename_family_member(leo.id, "   ").unwrap_err();
    assert_eq!(
        validation_error(&err),
        Some(&ValidationError::EmptyField("name"))
    );
    let err = catalog
        .rename_family_member(Uuid::new_v4(), "Noah")
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "family_member", .. }));
}

#[test]
fn caregivers_can_be_renamed_and_listed() {
    let conn = open_db_in_memory().unwrap();
    let catalog = catalog(&conn);
    let sam = catalog.add_caregiver("Sam").unwrap();
    let jo = catalog.add_caregiver("Jo").unwrap();
    catalog.set_caregiver_active(jo.id, false).unwrap();

    let renamed = catalog.rename_caregiver(sam.id, "Samira").unwrap();
    assert_eq!(renamed.name, "Samira");
    assert!(renamed.active);

    let listed = catalog.list_caregivers().unwrap();
    assert_eq!(listed, vec![renamed]);

    let err = catalog.rename_caregiver(Uuid::new_v4(), "Kim").unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "caregiver", .. }));
}
