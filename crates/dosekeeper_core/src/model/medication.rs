//! Medication catalog model.
//!
//! # Invariants
//! - `name` and `default_dose` are non-empty.
//! - The default frequency is exactly one of fixed or range.

use super::MedicationId;
use crate::engine::error::ValidationError;
use crate::engine::frequency::{FrequencyFields, FrequencySpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Medication with its default dose and dosing frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    pub name: String,
    /// Free-form dose text, e.g. `2.5mL`.
    pub default_dose: String,
    pub default_frequency: FrequencyFields,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Medication {
    /// Creates a validated medication with a generated stable ID.
    pub fn new(
        name: impl Into<String>,
        default_dose: impl Into<String>,
        default_frequency: FrequencyFields,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let medication = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            default_dose: default_dose.into(),
            default_frequency,
            notes: None,
            created_at,
        };
        medication.validate()?;
        Ok(medication)
    }

    /// Checks record invariants and returns the default frequency spec.
    pub fn validate(&self) -> Result<FrequencySpec, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.default_dose.trim().is_empty() {
            return Err(ValidationError::EmptyField("default_dose"));
        }
        self.default_frequency.validate_as_default()
    }
}

#[cfg(test)]
mod tests {
    use super::Medication;
    use crate::engine::error::ValidationError;
    use crate::engine::frequency::FrequencyFields;
    use chrono::Utc;

    #[test]
    fn medication_requires_a_default_frequency() {
        let err = Medication::new("Ibuprofen", "5mL", FrequencyFields::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingFrequency);
    }

    #[test]
    fn medication_rejects_blank_name() {
        let err = Medication::new("  ", "5mL", FrequencyFields::fixed(6.0), Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("name"));
    }
}
