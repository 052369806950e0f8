//! Domain records for medication tracking.
//!
//! # Responsibility
//! - Define the stored shapes of medications, household members,
//!   assignments, administrations and stock levels.
//! - Keep record-level validation next to the records.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Deactivation is a soft delete (`active = false`), never a row removal,
//!   except for administrations which may be deleted outright.

use uuid::Uuid;

pub mod administration;
pub mod assignment;
pub mod household;
pub mod inventory;
pub mod medication;
pub mod patch;

pub type AssignmentId = Uuid;
pub type AdministrationId = Uuid;
pub type CaregiverId = Uuid;
pub type FamilyMemberId = Uuid;
pub type InventoryId = Uuid;
pub type MedicationId = Uuid;
