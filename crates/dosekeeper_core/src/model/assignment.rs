//! Medication assignment domain model.
//!
//! # Responsibility
//! - Define the per-family-member medication assignment record.
//! - Define the sparse update payload consumed by the change auditor.
//! - Validate schedule metadata (`daily`/`weekly`, `HH:MM`, weekday lists).
//!
//! # Invariants
//! - `(family_member_id, medication_id)` identifies at most one assignment,
//!   active or not.
//! - Frequency override fields are fixed-xor-range, or entirely empty.
//! - Deactivation is a soft delete; rows are never removed.

use super::patch::FieldPatch;
use super::{AssignmentId, FamilyMemberId, MedicationId};
use crate::engine::error::ValidationError;
use crate::engine::frequency::FrequencyFields;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static SCHEDULE_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid schedule time regex"));

const SCHEDULE_TYPES: &[&str] = &["daily", "weekly"];
const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Unique identity pair of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentIdentity {
    pub family_member_id: FamilyMemberId,
    pub medication_id: MedicationId,
}

/// Mutable scheduling fields of an assignment.
///
/// Field order here is the order audit entries are emitted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentFields {
    /// Overrides the medication's default dose when set.
    pub current_dose: Option<String>,
    pub frequency_hours: Option<f64>,
    pub frequency_min_hours: Option<f64>,
    pub frequency_max_hours: Option<f64>,
    pub active: bool,
    /// `daily`, `weekly` or unset.
    pub schedule_type: Option<String>,
    /// `HH:MM`, 24-hour clock.
    pub schedule_time: Option<String>,
    /// Comma-separated lowercase weekday names.
    pub schedule_days: Option<String>,
}

impl Default for AssignmentFields {
    fn default() -> Self {
        Self {
            current_dose: None,
            frequency_hours: None,
            frequency_min_hours: None,
            frequency_max_hours: None,
            active: true,
            schedule_type: None,
            schedule_time: None,
            schedule_days: None,
        }
    }
}

impl AssignmentFields {
    /// Frequency override carried by these fields.
    pub fn frequency_override(&self) -> FrequencyFields {
        FrequencyFields {
            hours: self.frequency_hours,
            min_hours: self.frequency_min_hours,
            max_hours: self.frequency_max_hours,
        }
    }

    /// Validates the fields as a standalone record (creation path).
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.frequency_override().validate_as_override()?;
        validate_schedule(
            self.schedule_type.as_deref(),
            self.schedule_time.as_deref(),
            self.schedule_days.as_deref(),
        )
    }
}

/// Sparse update for `AssignmentFields`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssignmentPatch {
    pub current_dose: FieldPatch<String>,
    pub frequency_hours: FieldPatch<f64>,
    pub frequency_min_hours: FieldPatch<f64>,
    pub frequency_max_hours: FieldPatch<f64>,
    pub active: FieldPatch<bool>,
    pub schedule_type: FieldPatch<String>,
    pub schedule_time: FieldPatch<String>,
    pub schedule_days: FieldPatch<String>,
}

impl AssignmentPatch {
    /// Patch that only flips the active flag.
    pub fn set_active(active: bool) -> Self {
        Self {
            active: FieldPatch::Value(active),
            ..Self::default()
        }
    }

    pub fn touches_frequency(&self) -> bool {
        self.frequency_hours.is_set()
            || self.frequency_min_hours.is_set()
            || self.frequency_max_hours.is_set()
    }

    /// Frequency override after applying this patch over `current`.
    pub fn merged_frequency(&self, current: &AssignmentFields) -> FrequencyFields {
        FrequencyFields {
            hours: self.frequency_hours.proposed(&current.frequency_hours),
            min_hours: self.frequency_min_hours.proposed(&current.frequency_min_hours),
            max_hours: self.frequency_max_hours.proposed(&current.frequency_max_hours),
        }
    }
}

/// Persisted medication assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub family_member_id: FamilyMemberId,
    pub medication_id: MedicationId,
    #[serde(flatten)]
    pub fields: AssignmentFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Creates a new assignment with a generated stable ID.
    pub fn new(
        family_member_id: FamilyMemberId,
        medication_id: MedicationId,
        fields: AssignmentFields,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            family_member_id,
            medication_id,
            fields,
            created_at,
            updated_at: None,
        }
    }

    pub fn identity(&self) -> AssignmentIdentity {
        AssignmentIdentity {
            family_member_id: self.family_member_id,
            medication_id: self.medication_id,
        }
    }

    pub fn is_active(&self) -> bool {
        self.fields.active
    }
}

/// Validates optional schedule values; `None` means "nothing to check".
pub fn validate_schedule(
    schedule_type: Option<&str>,
    schedule_time: Option<&str>,
    schedule_days: Option<&str>,
) -> Result<(), ValidationError> {
    if let Some(value) = schedule_type {
        if !SCHEDULE_TYPES.contains(&value) {
            return Err(invalid_schedule("schedule_type", value));
        }
    }

    if let Some(value) = schedule_time {
        if !SCHEDULE_TIME_RE.is_match(value) {
            return Err(invalid_schedule("schedule_time", value));
        }
    }

    if let Some(value) = schedule_days {
        let valid = !value.is_empty() && value.split(',').all(|day| WEEKDAYS.contains(&day));
        if !valid {
            return Err(invalid_schedule("schedule_days", value));
        }
    }

    Ok(())
}

fn invalid_schedule(field: &'static str, value: &str) -> ValidationError {
    ValidationError::InvalidSchedule {
        field,
        value: value.to_string(),
    }
}
