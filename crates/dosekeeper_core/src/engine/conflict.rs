//! Assignment identity conflict guard.
//!
//! # Invariants
//! - No assignment is created while another row holds the same
//!   `(family_member_id, medication_id)` pair, including inactive rows.

use super::error::ConflictError;
use crate::model::assignment::AssignmentIdentity;
use crate::model::AssignmentId;
use serde::{Deserialize, Serialize};

/// Existing assignment found for an identity pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingAssignment {
    pub id: AssignmentId,
    pub active: bool,
    pub family_member_name: String,
    pub medication_name: String,
}

/// Fails with `ConflictError` when `lookup` finds any assignment for
/// `identity`, active or not.
pub fn check_assignment_conflict<F>(
    identity: &AssignmentIdentity,
    lookup: F,
) -> Result<(), ConflictError>
where
    F: FnOnce(&AssignmentIdentity) -> Option<ExistingAssignment>,
{
    match lookup(identity) {
        Some(existing) => Err(ConflictError {
            existing_assignment_id: existing.id,
            is_active: existing.active,
            family_member_name: existing.family_member_name,
            medication_name: existing.medication_name,
        }),
        None => Ok(()),
    }
}
