//! Assignment use-case service.
//!
//! # Responsibility
//! - Create, edit, deactivate and reactivate assignments.
//! - Compute dose readiness from the resolved frequency and last dose.
//! - Expose edit history and the scheduled-assignment view.
//!
//! # Invariants
//! - Every field change goes through the audited update path, including
//!   deactivation and reactivation.
//! - "Now" comes from the injected `Clock`, never from the wall clock
//!   directly.

use crate::engine::audit::AuditEntry;
use crate::engine::clock::Clock;
use crate::engine::frequency::resolve_frequency;
use crate::engine::lookup::AdministrationLookup;
use crate::engine::readiness::{evaluate_readiness, ReadinessStatus};
use crate::model::assignment::{Assignment, AssignmentFields, AssignmentPatch};
use crate::model::{AssignmentId, FamilyMemberId, MedicationId};
use crate::repo::assignment_repo::{
    AssignmentListQuery, AssignmentRepository, AuditedUpdate,
};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use serde::Serialize;

/// Readiness of one assignment with the labels a caller displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStatus {
    pub assignment_id: AssignmentId,
    pub family_member_name: String,
    pub medication_name: String,
    /// Assignment dose when set, medication default otherwise.
    pub dose: String,
    pub readiness: ReadinessStatus,
}

/// Use-case service for medication assignments.
pub struct AssignmentService<R, L, C>
where
    R: AssignmentRepository,
    L: AdministrationLookup<Error = RepoError>,
    C: Clock,
{
    repo: R,
    administrations: L,
    clock: C,
}

impl<R, L, C> AssignmentService<R, L, C>
where
    R: AssignmentRepository,
    L: AdministrationLookup<Error = RepoError>,
    C: Clock,
{
    pub fn new(repo: R, administrations: L, clock: C) -> Self {
        Self {
            repo,
            administrations,
            clock,
        }
    }

    /// Assigns a medication to a family member.
    ///
    /// Fails with a conflict when any assignment, active or not, already
    /// exists for the pair; reactivate that one instead.
    pub fn create_assignment(
        &self,
        family_member_id: FamilyMemberId,
        medication_id: MedicationId,
        fields: AssignmentFields,
    ) -> RepoResult<Assignment> {
        let assignment = Assignment::new(family_member_id, medication_id, fields, self.clock.now());
        match self.repo.create_assignment(&assignment) {
            Ok(_) => {
                info!(
                    "event=assignment_create module=service status=ok assignment_id={}",
                    assignment.id
                );
                Ok(assignment)
            }
            Err(err) => {
                warn!(
                    "event=assignment_create module=service status=error error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    pub fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        self.repo.get_assignment(id)
    }

    pub fn list_assignments(&self, query: &AssignmentListQuery) -> RepoResult<Vec<Assignment>> {
        self.repo.list_assignments(query)
    }

    /// Active assignments that carry a schedule type.
    pub fn list_scheduled(&self) -> RepoResult<Vec<Assignment>> {
        self.repo.list_assignments(&AssignmentListQuery {
            active: Some(true),
            scheduled_only: true,
            ..AssignmentListQuery::default()
        })
    }

    /// Applies a sparse patch and records one audit entry per changed field.
    pub fn update_assignment(
        &self,
        id: AssignmentId,
        patch: &AssignmentPatch,
    ) -> RepoResult<AuditedUpdate> {
        match self.repo.update_assignment(id, patch, self.clock.now()) {
            Ok(update) => {
                info!(
                    "event=assignment_update module=service status=ok assignment_id={id} changes={}",
                    update.entries.len()
                );
                Ok(update)
            }
            Err(err) => {
                warn!(
                    "event=assignment_update module=service status=error assignment_id={id} error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Soft-deletes an assignment; history and administrations are kept.
    pub fn deactivate_assignment(&self, id: AssignmentId) -> RepoResult<AuditedUpdate> {
        self.update_assignment(id, &AssignmentPatch::set_active(false))
    }

    pub fn reactivate_assignment(&self, id: AssignmentId) -> RepoResult<AuditedUpdate> {
        self.update_assignment(id, &AssignmentPatch::set_active(true))
    }

    /// Computes whether a dose can be given now.
    ///
    /// Fails with a configuration error when neither the assignment nor its
    /// medication yields a complete frequency.
    pub fn assignment_status(&self, id: AssignmentId) -> RepoResult<AssignmentStatus> {
        let detail = self
            .repo
            .get_assignment_detail(id)?
            .ok_or(RepoError::NotFound {
                entity: "assignment",
                id,
            })?;

        let spec = match resolve_frequency(
            &detail.medication.default_frequency,
            &detail.assignment.fields.frequency_override(),
        ) {
            Ok(spec) => spec,
            Err(err) => {
                warn!(
                    "event=assignment_status module=service status=error assignment_id={id} error_code=configuration_error"
                );
                return Err(err.into());
            }
        };
        let last = self.administrations.last_administered_at(id)?;
        let readiness = evaluate_readiness(&spec, last, self.clock.now());

        let dose = detail
            .assignment
            .fields
            .current_dose
            .clone()
            .unwrap_or_else(|| detail.medication.default_dose.clone());

        Ok(AssignmentStatus {
            assignment_id: id,
            family_member_name: detail.family_member_name,
            medication_name: detail.medication.name,
            dose,
            readiness,
        })
    }

    /// Edit history, newest change first.
    pub fn edit_history(&self, id: AssignmentId) -> RepoResult<Vec<AuditEntry>> {
        self.repo.list_audit_entries(id)
    }
}
