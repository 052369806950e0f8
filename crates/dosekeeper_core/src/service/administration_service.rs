//! Dose logging use-case service.
//!
//! # Responsibility
//! - Normalize and bound administration timestamps before persisting.
//! - Apply operator corrections under the same timestamp bounds.
//!
//! # Invariants
//! - `administered_at` is never in the future and never older than the
//!   backdating window, measured against the injected clock.
//! - `dose_given` is never empty.

use crate::engine::clock::Clock;
use crate::engine::temporal::normalize_administered_at;
use crate::model::administration::{
    non_empty_dose, Administration, AdministrationCorrection, AdministrationListQuery,
    NewAdministration,
};
use crate::model::AdministrationId;
use crate::repo::administration_repo::AdministrationRepository;
use crate::repo::RepoResult;
use log::{info, warn};
use uuid::Uuid;

/// Use-case service for dose administrations.
pub struct AdministrationService<R: AdministrationRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: AdministrationRepository, C: Clock> AdministrationService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Records a dose. A missing timestamp means "now".
    pub fn log_dose(&self, request: NewAdministration) -> RepoResult<Administration> {
        let now = self.clock.now();
        let administered_at = normalize_administered_at(request.administered_at.as_ref(), now)
            .inspect_err(|_| {
                warn!("event=dose_log module=service status=error error_code=validation_error");
            })?;
        let dose_given = non_empty_dose(request.dose_given)?;

        let administration = Administration {
            id: Uuid::new_v4(),
            assignment_id: request.assignment_id,
            caregiver_id: request.caregiver_id,
            administered_at,
            dose_given,
            notes: request.notes,
            created_at: now,
        };

        match self.repo.create_administration(&administration) {
            Ok(_) => {
                info!(
                    "event=dose_log module=service status=ok administration_id={} assignment_id={}",
                    administration.id, administration.assignment_id
                );
                Ok(administration)
            }
            Err(err) => {
                warn!(
                    "event=dose_log module=service status=error assignment_id={} error_code={}",
                    administration.assignment_id,
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Corrects a logged dose. The assignment link never changes.
    pub fn correct_dose(
        &self,
        id: AdministrationId,
        correction: &AdministrationCorrection,
    ) -> RepoResult<Administration> {
        match self
            .repo
            .update_administration(id, correction, self.clock.now())
        {
            Ok(administration) => {
                info!("event=dose_correct module=service status=ok administration_id={id}");
                Ok(administration)
            }
            Err(err) => {
                warn!(
                    "event=dose_correct module=service status=error administration_id={id} error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    pub fn get_administration(&self, id: AdministrationId) -> RepoResult<Option<Administration>> {
        self.repo.get_administration(id)
    }

    /// Lists doses newest first.
    pub fn list_administrations(
        &self,
        query: &AdministrationListQuery,
    ) -> RepoResult<Vec<Administration>> {
        self.repo.list_administrations(query)
    }

    pub fn delete_administration(&self, id: AdministrationId) -> RepoResult<()> {
        self.repo.delete_administration(id)?;
        info!("event=dose_delete module=service status=ok administration_id={id}");
        Ok(())
    }
}
