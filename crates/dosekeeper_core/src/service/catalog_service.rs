//! Medication catalog and household use-case service.

use crate::engine::clock::Clock;
use crate::engine::frequency::FrequencyFields;
use crate::model::household::{non_empty_name, Caregiver, FamilyMember};
use crate::model::medication::Medication;
use crate::model::{CaregiverId, FamilyMemberId, MedicationId};
use crate::repo::household_repo::HouseholdRepository;
use crate::repo::medication_repo::MedicationRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;

/// Request model for adding a medication.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedication {
    pub name: String,
    pub default_dose: String,
    pub default_frequency: FrequencyFields,
    pub notes: Option<String>,
}

/// Use-case service for medications, family members and caregivers.
pub struct CatalogService<M: MedicationRepository, H: HouseholdRepository, C: Clock> {
    medications: M,
    household: H,
    clock: C,
}

impl<M: MedicationRepository, H: HouseholdRepository, C: Clock> CatalogService<M, H, C> {
    pub fn new(medications: M, household: H, clock: C) -> Self {
        Self {
            medications,
            household,
            clock,
        }
    }

    /// Adds a medication; the default frequency must be exactly one kind.
    pub fn add_medication(&self, request: NewMedication) -> RepoResult<Medication> {
        let mut medication = Medication::new(
            request.name,
            request.default_dose,
            request.default_frequency,
            self.clock.now(),
        )?;
        medication.notes = request.notes;
        self.medications.create_medication(&medication)?;
        info!(
            "event=medication_create module=service status=ok medication_id={}",
            medication.id
        );
        Ok(medication)
    }

    pub fn get_medication(&self, id: MedicationId) -> RepoResult<Option<Medication>> {
        self.medications.get_medication(id)
    }

    pub fn list_medications(&self) -> RepoResult<Vec<Medication>> {
        self.medications.list_medications()
    }

    /// Rewrites a medication after re-validating it.
    pub fn update_medication(&self, medication: &Medication) -> RepoResult<()> {
        self.medications.update_medication(medication)?;
        info!(
            "event=medication_update module=service status=ok medication_id={}",
            medication.id
        );
        Ok(())
    }

    pub fn add_family_member(&self, name: impl Into<String>) -> RepoResult<FamilyMember> {
        let member = FamilyMember::new(name, self.clock.now())?;
        self.household.create_family_member(&member)?;
        info!(
            "event=family_member_create module=service status=ok family_member_id={}",
            member.id
        );
        Ok(member)
    }

    pub fn get_family_member(&self, id: FamilyMemberId) -> RepoResult<Option<FamilyMember>> {
        self.household.get_family_member(id)
    }

    /// Inactive family members cannot receive new assignments.
    pub fn set_family_member_active(&self, id: FamilyMemberId, active: bool) -> RepoResult<()> {
        self.household.set_family_member_active(id, active)
    }

    pub fn rename_family_member(
        &self,
        id: FamilyMemberId,
        name: impl Into<String>,
    ) -> RepoResult<FamilyMember> {
        let name = non_empty_name(name.into())?;
        self.household.rename_family_member(id, &name)?;
        info!("event=family_member_rename module=service status=ok family_member_id={id}");
        self.household
            .get_family_member(id)?
            .ok_or(RepoError::NotFound {
                entity: "family_member",
                id,
            })
    }

    /// Active family members only, matching the household picker.
    pub fn list_family_members(&self) -> RepoResult<Vec<FamilyMember>> {
        self.household.list_family_members(Some(true))
    }

    pub fn add_caregiver(&self, name: impl Into<String>) -> RepoResult<Caregiver> {
        let caregiver = Caregiver::new(name, self.clock.now())?;
        self.household.create_caregiver(&caregiver)?;
        info!(
            "event=caregiver_create module=service status=ok caregiver_id={}",
            caregiver.id
        );
        Ok(caregiver)
    }

    pub fn get_caregiver(&self, id: CaregiverId) -> RepoResult<Option<Caregiver>> {
        self.household.get_caregiver(id)
    }

    /// Inactive caregivers cannot log new doses.
    pub fn set_caregiver_active(&self, id: CaregiverId, active: bool) -> RepoResult<()> {
        self.household.set_caregiver_active(id, active)
    }

    pub fn rename_caregiver(&self, id: CaregiverId, name: impl Into<String>) -> RepoResult<Caregiver> {
        let name = non_empty_name(name.into())?;
        self.household.rename_caregiver(id, &name)?;
        info!("event=caregiver_rename module=service status=ok caregiver_id={id}");
        self.household
            .get_caregiver(id)?
            .ok_or(RepoError::NotFound {
                entity: "caregiver",
                id,
            })
    }

    /// Active caregivers only.
    pub fn list_caregivers(&self) -> RepoResult<Vec<Caregiver>> {
        self.household.list_caregivers(Some(true))
    }
}
