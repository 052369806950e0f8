//! CLI inspection entry point.
//!
//! # Responsibility
//! - Open a dose tracker database and print readiness for every active
//!   assignment, then any medication running low on stock.
//! - Keep output line-oriented (`key=value`) for quick local checks.
//!
//! Database path: first argument, else `DOSEKEEPER_DB_PATH`.
//! File logging starts only when `DOSEKEEPER_LOG_DIR` is set.

use dosekeeper_core::{
    default_log_level, init_logging, open_db, AssignmentListQuery, AssignmentService,
    InventoryService, RepoResult, SqliteAdministrationRepository, SqliteAssignmentRepository,
    SqliteInventoryRepository, SystemClock,
};
use log::info;
use std::process::ExitCode;

const DB_PATH_ENV: &str = "DOSEKEEPER_DB_PATH";
const LOG_DIR_ENV: &str = "DOSEKEEPER_LOG_DIR";

fn main() -> ExitCode {
    println!("dosekeeper_core ping={}", dosekeeper_core::ping());
    println!("dosekeeper_core version={}", dosekeeper_core::core_version());

    let Some(db_path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(DB_PATH_ENV).ok())
    else {
        eprintln!("usage: dosekeeper_cli <db-path> (or set {DB_PATH_ENV})");
        return ExitCode::from(2);
    };

    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match print_statuses(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error code={} message={err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn print_statuses(db_path: &str) -> RepoResult<()> {
    let conn = open_db(db_path)?;
    let service = AssignmentService::new(
        SqliteAssignmentRepository::try_new(&conn)?,
        SqliteAdministrationRepository::try_new(&conn)?,
        SystemClock,
    );

    let active = service.list_assignments(&AssignmentListQuery {
        active: Some(true),
        ..AssignmentListQuery::default()
    })?;

    for assignment in &active {
        match service.assignment_status(assignment.id) {
            Ok(status) => {
                let readiness = &status.readiness;
                println!(
                    "assignment={} member={:?} medication={:?} dose={:?} status={:?} can_administer={} next_dose={}",
                    status.assignment_id,
                    status.family_member_name,
                    status.medication_name,
                    status.dose,
                    readiness.state,
                    readiness.can_administer,
                    readiness
                        .next_dose_time
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "now".to_string()),
                );
            }
            // Misconfigured assignments must not hide the rest.
            Err(err) => println!("assignment={} error={}", assignment.id, err.code()),
        }
    }

    let low_stock = InventoryService::new(SqliteInventoryRepository::try_new(&conn)?, SystemClock)
        .list_low_stock()?;
    for record in &low_stock {
        println!(
            "low_stock medication={} quantity={} unit={:?} threshold={}",
            record.medication_id,
            record.quantity,
            record.unit,
            record.low_stock_threshold.unwrap_or_default(),
        );
    }

    info!(
        "event=cli_status module=cli status=ok assignments={} low_stock={}",
        active.len(),
        low_stock.len()
    );
    Ok(())
}
