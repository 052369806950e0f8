//! Medication stock use-case service.

use crate::engine::clock::Clock;
use crate::model::inventory::{InventoryLevel, InventoryPatch, MedicationInventory};
use crate::model::{InventoryId, MedicationId};
use crate::repo::inventory_repo::InventoryRepository;
use crate::repo::RepoResult;
use log::{info, warn};

/// Use-case service for stock levels.
pub struct InventoryService<R: InventoryRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: InventoryRepository, C: Clock> InventoryService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Records the stock of a medication, replacing any earlier level.
    pub fn record_inventory(&self, level: &InventoryLevel) -> RepoResult<MedicationInventory> {
        match self.repo.upsert_inventory(level, self.clock.now()) {
            Ok(record) => {
                info!(
                    "event=inventory_record module=service status=ok inventory_id={} medication_id={} low_stock={}",
                    record.id,
                    record.medication_id,
                    record.is_low_stock()
                );
                Ok(record)
            }
            Err(err) => {
                warn!(
                    "event=inventory_record module=service status=error medication_id={} error_code={}",
                    level.medication_id,
                    err.code()
                );
                Err(err)
            }
        }
    }

    pub fn get_inventory(&self, id: InventoryId) -> RepoResult<Option<MedicationInventory>> {
        self.repo.get_inventory(id)
    }

    pub fn inventory_for_medication(
        &self,
        medication_id: MedicationId,
    ) -> RepoResult<Option<MedicationInventory>> {
        self.repo.get_inventory_for_medication(medication_id)
    }

    pub fn update_inventory(
        &self,
        id: InventoryId,
        patch: &InventoryPatch,
    ) -> RepoResult<MedicationInventory> {
        let record = self.repo.update_inventory(id, patch, self.clock.now())?;
        info!(
            "event=inventory_update module=service status=ok inventory_id={id} low_stock={}",
            record.is_low_stock()
        );
        Ok(record)
    }

    pub fn list_inventory(&self) -> RepoResult<Vec<MedicationInventory>> {
        self.repo.list_inventory()
    }

    pub fn list_low_stock(&self) -> RepoResult<Vec<MedicationInventory>> {
        self.repo.list_low_stock()
    }

    pub fn delete_inventory(&self, id: InventoryId) -> RepoResult<()> {
        self.repo.delete_inventory(id)?;
        info!("event=inventory_delete module=service status=ok inventory_id={id}");
        Ok(())
    }
}
