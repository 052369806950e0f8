//! Core domain logic for DoseKeeper.
//! Dose readiness, assignment auditing, dose logging and stock tracking live
//! here; callers only orchestrate.

pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::audit::{diff_for_audit, AuditEntry};
pub use engine::clock::{Clock, FixedClock, SystemClock};
pub use engine::conflict::{check_assignment_conflict, ExistingAssignment};
pub use engine::error::{ConfigurationError, ConflictError, EngineError, ValidationError};
pub use engine::frequency::{resolve_frequency, FrequencyFields, FrequencyKind, FrequencySpec};
pub use engine::readiness::{evaluate_readiness, ReadinessState, ReadinessStatus};
pub use engine::temporal::{normalize_administered_at, TimestampInput};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::assignment::{Assignment, AssignmentFields, AssignmentIdentity, AssignmentPatch};
pub use model::patch::FieldPatch;
pub use model::administration::{
    Administration, AdministrationCorrection, AdministrationListQuery, NewAdministration,
};
pub use model::household::{Caregiver, FamilyMember};
pub use model::inventory::{InventoryLevel, InventoryPatch, MedicationInventory};
pub use model::medication::Medication;
pub use repo::administration_repo::{AdministrationRepository, SqliteAdministrationRepository};
pub use repo::assignment_repo::{
    AssignmentDetail, AssignmentListQuery, AssignmentRepository, AuditedUpdate,
    SqliteAssignmentRepository,
};
pub use repo::household_repo::{HouseholdRepository, SqliteHouseholdRepository};
pub use repo::inventory_repo::{InventoryRepository, SqliteInventoryRepository};
pub use repo::medication_repo::{MedicationRepository, SqliteMedicationRepository};
pub use repo::{RepoError, RepoResult};
pub use service::administration_service::AdministrationService;
pub use service::assignment_service::{AssignmentService, AssignmentStatus};
pub use service::catalog_service::{CatalogService, NewMedication};
pub use service::inventory_service::InventoryService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
