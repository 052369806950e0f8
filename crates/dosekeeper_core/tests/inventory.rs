use chrono::{DateTime, Duration, TimeZone, Utc};
use dosekeeper_core::db::open_db_in_memory;
use dosekeeper_core::{
    CatalogService, EngineError, FieldPatch, FixedClock, FrequencyFields, InventoryLevel,
    InventoryPatch, InventoryService, Medication, NewMedication, RepoError,
    SqliteHouseholdRepository, SqliteInventoryRepository, SqliteMedicationRepository,
    ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn stock_at(
    conn: &Connection,
    at: DateTime<Utc>,
) -> InventoryService<SqliteInventoryRepository<'_>, FixedClock> {
    InventoryService::new(SqliteInventoryRepository::try_new(conn).unwrap(), FixedClock(at))
}

fn add_medication(conn: &Connection, name: &str) -> Medication {
    CatalogService::new(
        SqliteMedicationRepository::try_new(conn).unwrap(),
        SqliteHouseholdRepository::try_new(conn).unwrap(),
        FixedClock(now()),
    )
    .add_medication(NewMedication {
        name: name.to_string(),
        default_dose: "5mL".to_string(),
        default_frequency: FrequencyFields::fixed(6.0),
        notes: None,
    })
    .unwrap()
}

fn level(medication: &Medication, quantity: f64, threshold: Option<f64>) -> InventoryLevel {
    InventoryLevel {
        medication_id: medication.id,
        quantity,
        unit: "mL".to_string(),
        low_stock_threshold: threshold,
    }
}

fn inventory_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM medication_inventory;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn recording_twice_rewrites_the_single_record() {
    let conn = open_db_in_memory().unwrap();
    let ibuprofen = add_medication(&conn, "Ibuprofen");

    let first = stock_at(&conn, now())
        .record_inventory(&level(&ibuprofen, 100.0, Some(20.0)))
        .unwrap();
    let later = now() + Duration::hours(2);
    let second = stock_at(&conn, later)
        .record_inventory(&InventoryLevel {
            unit: "bottles".to_string(),
            ..level(&ibuprofen, 2.0, None)
        })
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.quantity, 2.0);
    assert_eq!(second.unit, "bottles");
    assert_eq!(second.low_stock_threshold, None);
    assert_eq!(second.last_updated, later);
    assert_eq!(inventory_rows(&conn), 1);

    let stored = stock_at(&conn, later)
        .inventory_for_medication(ibuprofen.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored, second);
}

#[test]
fn unknown_medication_and_invalid_amounts_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let ibuprofen = add_medication(&conn, "Ibuprofen");
    let service = stock_at(&conn, now());

    let missing = Uuid::new_v4();
    let err = service
        .record_inventory(&InventoryLevel {
            medication_id: missing,
            ..level(&ibuprofen, 10.0, None)
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "medication", id } if id == missing));

    let err = service
        .record_inventory(&level(&ibuprofen, -5.0, None))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Engine(EngineError::Validation(ValidationError::InvalidQuantity(
            "quantity"
        )))
    ));
    assert_eq!(err.code(), "validation_error");
    assert_eq!(inventory_rows(&conn), 0);
}

#[test]
fn low_stock_lists_records_at_or_below_a_positive_threshold() {
    let conn = open_db_in_memory().unwrap();
    let service = stock_at(&conn, now());

    let at_threshold = service
        .record_inventory(&level(&add_medication(&conn, "Paracetamol"), 20.0, Some(20.0)))
        .unwrap();
    let below = service
        .record_inventory(&level(&add_medication(&conn, "Cetirizine"), 3.0, Some(10.0)))
        .unwrap();
    service
        .record_inventory(&level(&add_medication(&conn, "Ibuprofen"), 80.0, Some(20.0)))
        .unwrap();
    service
        .record_inventory(&level(&add_medication(&conn, "Amoxicillin"), 0.0, Some(0.0)))
        .unwrap();
    service
        .record_inventory(&level(&add_medication(&conn, "Zinc"), 0.0, None))
        .unwrap();

    let low: Vec<_> = service
        .list_low_stock()
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(low, vec![below.id, at_threshold.id]);

    let all = service.list_inventory().unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(
        all.iter().filter(|record| record.is_low_stock()).count(),
        low.len()
    );
}

#[test]
fn update_patches_levels_and_delete_removes_the_record() {
    let conn = open_db_in_memory().unwrap();
    let ibuprofen = add_medication(&conn, "Ibuprofen");
    let recorded = stock_at(&conn, now())
        .record_inventory(&level(&ibuprofen, 100.0, Some(20.0)))
        .unwrap();

    let later = now() + Duration::hours(1);
    let service = stock_at(&conn, later);
    let updated = service
        .update_inventory(
            recorded.id,
            &InventoryPatch {
                quantity: Some(15.0),
                ..InventoryPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.quantity, 15.0);
    assert_eq!(updated.low_stock_threshold, Some(20.0));
    assert_eq!(updated.last_updated, later);
    assert!(updated.is_low_stock());
    assert_eq!(service.get_inventory(recorded.id).unwrap().unwrap(), updated);

    let cleared = service
        .update_inventory(
            recorded.id,
            &InventoryPatch {
                low_stock_threshold: FieldPatch::Null,
                ..InventoryPatch::default()
            },
        )
        .unwrap();
    assert!(service.list_low_stock().unwrap().is_empty());
    assert_eq!(cleared.quantity, 15.0);

    service.delete_inventory(recorded.id).unwrap();
    assert!(service.get_inventory(recorded.id).unwrap().is_none());
    let err = service
        .update_inventory(recorded.id, &InventoryPatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "inventory", .. }));
    assert_eq!(service.delete_inventory(recorded.id).unwrap_err().code(), "not_found");
}
