use chrono::{DateTime, Duration, TimeZone, Utc};
use dosekeeper_core::db::open_db_in_memory;
use dosekeeper_core::{
    AdministrationService, Assignment, AssignmentFields, AssignmentService, CatalogService,
    ConfigurationError, EngineError, FixedClock, FrequencyFields, FrequencyKind, NewAdministration,
    NewMedication, ReadinessState, RepoError, SqliteAdministrationRepository,
    SqliteAssignmentRepository, SqliteHouseholdRepository, SqliteMedicationRepository,
};
use rusqlite::Connection;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn seed_assignment(
    conn: &Connection,
    default_frequency: FrequencyFields,
    fields: AssignmentFields,
) -> Assignment {
    let catalog = CatalogService::new(
        SqliteMedicationRepository::try_new(conn).unwrap(),
        SqliteHouseholdRepository::try_new(conn).unwrap(),
        FixedClock(now() - Duration::days(1)),
    );
    let member = catalog.add_family_member("Mia").unwrap();
    let medication = catalog
        .add_medication(NewMedication {
            name: "Paracetamol".to_string(),
            default_dose: "240mg".to_string(),
            default_frequency,
            notes: None,
        })
        .unwrap();

    assignment_service(conn)
        .create_assignment(member.id, medication.id, fields)
        .unwrap()
}

fn assignment_service(
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

fn log_dose_at(conn: &Connection, assignment: &Assignment, at: DateTime<Utc>) {
    AdministrationService::new(
        SqliteAdministrationRepository::try_new(conn).unwrap(),
        FixedClock(now()),
    )
    .log_dose(NewAdministration {
        assignment_id: assignment.id,
        caregiver_id: None,
        administered_at: Some(at.into()),
        dose_given: "240mg".to_string(),
        notes: None,
    })
    .unwrap();
}

#[test]
fn never_administered_is_ready() {
    let conn = open_db_in_memory().unwrap();
    let assignment = seed_assignment(
        &conn,
        FrequencyFields::fixed(4.0),
        AssignmentFields::default(),
    );

    let status = assignment_service(&conn)
        .assignment_status(assignment.id)
        .unwrap();

    assert_eq!(status.readiness.state, ReadinessState::Ready);
    assert!(status.readiness.can_administer);
    assert_eq!(status.readiness.last_administration, None);
    assert_eq!(status.readiness.next_dose_time, None);
    assert_eq!(status.family_member_name, "Mia");
    assert_eq!(status.medication_name, "Paracetamol");
    assert_eq!(status.dose, "240mg");
}

#[test]
fn fixed_frequency_is_soon_inside_the_last_hour() {
    let conn = open_db_in_memory().unwrap();
    let assignment = seed_assignment(
        &conn,
        FrequencyFields::fixed(4.0),
        AssignmentFields::default(),
    );
    let last = now() - Duration::minutes(210);
    log_dose_at(&conn, &assignment, last);

    let status = assignment_service(&conn)
        .assignment_status(assignment.id)
        .unwrap();

    assert_eq!(status.readiness.state, ReadinessState::Soon);
    assert!(!status.readiness.can_administer);
    assert_eq!(status.readiness.time_until_next, Some(0.5));
    assert_eq!(status.readiness.last_administration, Some(last));
    assert_eq!(
        status.readiness.next_dose_time,
        Some(last + Duration::hours(4))
    );
    assert_eq!(status.readiness.frequency_kind, FrequencyKind::Fixed);
}

#[test]
fn latest_administration_drives_readiness() {
    let conn = open_db_in_memory().unwrap();
    let assignment = seed_assignment(
        &conn,
        FrequencyFields::fixed(4.0),
        AssignmentFields::default(),
    );
    log_dose_at(&conn, &assignment, now() - Duration::hours(2));
    log_dose_at(&conn, &assignment, now() - Duration::hours(10));

    let status = assignment_service(&conn)
        .assignment_status(assignment.id)
        .unwrap();

    assert_eq!(status.readiness.state, ReadinessState::Ready);
    assert!(!status.readiness.can_administer);
    assert_eq!(
        status.readiness.last_administration,
        Some(now() - Duration::hours(2))
    );
}

#[test]
fn range_override_wins_and_reports_overdue() {
    let conn = open_db_in_memory().unwrap();
    let assignment = seed_assignment(
        &conn,
        FrequencyFields::fixed(12.0),
        AssignmentFields {
            frequency_min_hours: Some(4.0),
            frequency_max_hours: Some(6.0),
            current_dose: Some("120mg".to_string()),
            ..AssignmentFields::default()
        },
    );
    log_dose_at(&conn, &assignment, now() - Duration::hours(7));

    let status = assignment_service(&conn)
        .assignment_status(assignment.id)
        .unwrap();

    assert_eq!(status.readiness.state, ReadinessState::Overdue);
    assert!(status.readiness.can_administer);
    assert_eq!(status.readiness.frequency_kind, FrequencyKind::Range);
    assert_eq!(status.readiness.time_until_max, None);
    assert_eq!(
        status.readiness.next_dose_max_time,
        Some(now() - Duration::hours(1))
    );
    assert_eq!(status.dose, "120mg");
}

#[test]
fn partial_range_override_is_a_configuration_error() {
    let conn = open_db_in_memory().unwrap();
    let assignment = seed_assignment(
        &conn,
        FrequencyFields::fixed(4.0),
        AssignmentFields {
            frequency_min_hours: Some(4.0),
            ..AssignmentFields::default()
        },
    );

    let err = assignment_service(&conn)
        .assignment_status(assignment.id)
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Engine(EngineError::Configuration(
            ConfigurationError::IncompleteRangeOverride
        ))
    ));
    assert_eq!(err.code(), "configuration_error");
}

#[test]
fn status_is_stable_for_a_pinned_clock() {
    let conn = open_db_in_memory().unwrap();
    let assignment = seed_assignment(
        &conn,
        FrequencyFields::range(4.0, 6.0),
        AssignmentFields::default(),
    );
    log_dose_at(&conn, &assignment, now() - Duration::minutes(210));

    let service = assignment_service(&conn);
    let first = service.assignment_status(assignment.id).unwrap();
    let second = service.assignment_status(assignment.id).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.readiness.state, ReadinessState::Soon);
}
