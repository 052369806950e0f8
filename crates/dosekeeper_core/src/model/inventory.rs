//! Medication stock on hand.
//!
//! # Invariants
//! - At most one record per medication.
//! - `quantity` and `low_stock_threshold` are finite and never negative.
//! - A record is low on stock when its threshold is positive and the
//!   quantity has fallen to or below it. A zero threshold never alerts.

use super::patch::FieldPatch;
use super::{InventoryId, MedicationId};
use crate::engine::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted stock level of one medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationInventory {
    pub id: InventoryId,
    pub medication_id: MedicationId,
    pub quantity: f64,
    /// Free text such as `mL`, `tablets` or `capsules`.
    pub unit: String,
    pub low_stock_threshold: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl MedicationInventory {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount("quantity", self.quantity)?;
        if let Some(threshold) = self.low_stock_threshold {
            check_amount("low_stock_threshold", threshold)?;
        }
        if self.unit.trim().is_empty() {
            return Err(ValidationError::EmptyField("unit"));
        }
        Ok(())
    }

    pub fn is_low_stock(&self) -> bool {
        matches!(
            self.low_stock_threshold,
            Some(threshold) if threshold > 0.0 && self.quantity <= threshold
        )
    }
}

/// Stock to record for a medication. Replaces the existing level if any.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryLevel {
    pub medication_id: MedicationId,
    pub quantity: f64,
    pub unit: String,
    pub low_stock_threshold: Option<f64>,
}

/// Sparse edit of a stock record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryPatch {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub low_stock_threshold: FieldPatch<f64>,
}

impl InventoryPatch {
    /// Applies the patch and stamps `last_updated`. The result is validated.
    pub fn apply(
        &self,
        mut inventory: MedicationInventory,
        now: DateTime<Utc>,
    ) -> Result<MedicationInventory, ValidationError> {
        if let Some(quantity) = self.quantity {
            inventory.quantity = quantity;
        }
        if let Some(unit) = &self.unit {
            inventory.unit.clone_from(unit);
        }
        inventory.low_stock_threshold = self
            .low_stock_threshold
            .proposed(&inventory.low_stock_threshold);
        inventory.last_updated = now;
        inventory.validate()?;
        Ok(inventory)
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidQuantity(field));
    }
    Ok(())
}
