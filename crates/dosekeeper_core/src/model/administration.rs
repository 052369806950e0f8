//! Administration (dose given) records.
//!
//! # Invariants
//! - `administered_at` is a UTC instant inside the backdating window at the
//!   time it was accepted or last corrected.
//! - The record identity and its assignment never change after creation.

use super::patch::FieldPatch;
use super::{AdministrationId, AssignmentId, CaregiverId, FamilyMemberId, MedicationId};
use crate::engine::error::ValidationError;
use crate::engine::temporal::{normalize_administered_at, TimestampInput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted dose administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administration {
    pub id: AdministrationId,
    pub assignment_id: AssignmentId,
    pub caregiver_id: Option<CaregiverId>,
    pub administered_at: DateTime<Utc>,
    pub dose_given: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request to log a dose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdministration {
    pub assignment_id: AssignmentId,
    pub caregiver_id: Option<CaregiverId>,
    /// Absent means "now".
    pub administered_at: Option<TimestampInput>,
    pub dose_given: String,
    pub notes: Option<String>,
}

/// Operator correction of a logged dose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdministrationCorrection {
    /// Re-validated against the backdating window when present.
    pub administered_at: Option<TimestampInput>,
    pub dose_given: Option<String>,
    pub caregiver_id: FieldPatch<CaregiverId>,
    pub notes: FieldPatch<String>,
}

impl AdministrationCorrection {
    /// Applies the correction to the stored row, bounding a new timestamp
    /// against `now`.
    pub fn apply(
        &self,
        mut administration: Administration,
        now: DateTime<Utc>,
    ) -> Result<Administration, ValidationError> {
        if let Some(input) = self.administered_at.as_ref() {
            administration.administered_at = normalize_administered_at(Some(input), now)?;
        }
        if let Some(dose_given) = &self.dose_given {
            administration.dose_given = non_empty_dose(dose_given.clone())?;
        }
        administration.caregiver_id = self.caregiver_id.proposed(&administration.caregiver_id);
        administration.notes = self.notes.proposed(&administration.notes);
        Ok(administration)
    }
}

/// Listing filter for administrations. Filters combine with AND.
#[derive(Debug, Clone, Default)]
pub struct AdministrationListQuery {
    pub assignment_id: Option<AssignmentId>,
    /// Doses of any assignment held by this family member.
    pub family_member_id: Option<FamilyMemberId>,
    /// Doses of any assignment of this medication.
    pub medication_id: Option<MedicationId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

pub(crate) fn non_empty_dose(dose_given: String) -> Result<String, ValidationError> {
    if dose_given.trim().is_empty() {
        return Err(ValidationError::EmptyField("dose_given"));
    }
    Ok(dose_given)
}
