//! Error taxonomy returned by the dose engine.
//!
//! # Responsibility
//! - Describe caller-input failures (`ValidationError`).
//! - Describe unusable frequency configuration (`ConfigurationError`).
//! - Describe duplicate assignment identities (`ConflictError`).
//!
//! # Invariants
//! - Engine calls return these as values; they never panic on bad input.
//! - A returned error means no partial result was produced.

use crate::model::AssignmentId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum allowed backdating window, shared with the temporal normalizer.
pub const MAX_BACKDATE_HOURS: i64 = 24;

/// Malformed or contradictory caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Fixed hours and a complete range were supplied together.
    BothFrequencies,
    /// Neither fixed hours nor a complete range was supplied.
    MissingFrequency,
    /// Range minimum is not strictly below the maximum.
    RangeNotIncreasing,
    /// A frequency value is zero or negative.
    NonPositiveHours,
    /// A frequency value is NaN or infinite.
    NonFiniteHours,
    /// A non-nullable field was supplied as null.
    NullField(&'static str),
    /// A required text field is empty after trimming.
    EmptyField(&'static str),
    /// A schedule field value is outside its accepted shape.
    InvalidSchedule { field: &'static str, value: String },
    /// Timestamp text could not be parsed.
    InvalidDatetimeFormat(String),
    /// Timestamp lies after the current instant.
    FutureTimestamp,
    /// Timestamp lies before the backdating window.
    TimestampTooOld,
    /// A stock amount is negative, NaN or infinite.
    InvalidQuantity(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BothFrequencies => {
                write!(f, "frequency cannot be both fixed and range")
            }
            Self::MissingFrequency => {
                write!(f, "frequency must be either fixed or range")
            }
            Self::RangeNotIncreasing => write!(f, "range minimum must be less than maximum"),
            Self::NonPositiveHours => write!(f, "frequency hours must be greater than 0"),
            Self::NonFiniteHours => write!(f, "frequency hours must be a finite number"),
            Self::NullField(field) => write!(f, "field `{field}` cannot be null"),
            Self::EmptyField(field) => write!(f, "field `{field}` cannot be empty"),
            Self::InvalidSchedule { field, value } => {
                write!(f, "invalid {field} value `{value}`")
            }
            Self::InvalidDatetimeFormat(value) => {
                write!(f, "invalid datetime format: `{value}`")
            }
            Self::FutureTimestamp => write!(f, "administration time cannot be in the future"),
            Self::TimestampTooOld => write!(
                f,
                "administration time cannot be more than {MAX_BACKDATE_HOURS} hours in the past"
            ),
            Self::InvalidQuantity(field) => {
                write!(f, "field `{field}` must be a finite number of at least 0")
            }
        }
    }
}

impl Error for ValidationError {}

/// A medication/assignment pair has no usable frequency configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither the override nor the medication default yields a frequency.
    FrequencyNotConfigured,
    /// The override carries only one range bound.
    IncompleteRangeOverride,
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrequencyNotConfigured => write!(f, "frequency not configured"),
            Self::IncompleteRangeOverride => write!(
                f,
                "frequency not configured: range override requires both min and max hours"
            ),
        }
    }
}

impl Error for ConfigurationError {}

/// An assignment already exists for the requested identity pair.
///
/// Carries enough detail for the caller to offer reactivation instead of
/// creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictError {
    pub existing_assignment_id: AssignmentId,
    pub is_active: bool,
    pub family_member_name: String,
    pub medication_name: String,
}

impl ConflictError {
    /// Human-readable message shaped by the existing row's active flag.
    pub fn message(&self) -> &'static str {
        if self.is_active {
            "an active assignment already exists for this medication and family member"
        } else {
            "an inactive assignment exists for this medication and family member; reactivate it instead"
        }
    }
}

impl Display for ConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (assignment {})",
            self.message(),
            self.existing_assignment_id
        )
    }
}

impl Error for ConflictError {}

/// Union of every failure the engine can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Validation(ValidationError),
    Configuration(ConfigurationError),
    Conflict(ConflictError),
}

impl EngineError {
    /// Stable machine-readable code for transport mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Configuration(_) => "configuration_error",
            Self::Conflict(_) => "conflict",
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Configuration(err) => write!(f, "{err}"),
            Self::Conflict(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Configuration(err) => Some(err),
            Self::Conflict(err) => Some(err),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConfigurationError> for EngineError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<ConflictError> for EngineError {
    fn from(value: ConflictError) -> Self {
        Self::Conflict(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictError, EngineError, ValidationError};
    use uuid::Uuid;

    #[test]
    fn backdate_message_names_the_window() {
        let message = ValidationError::TimestampTooOld.to_string();
        assert!(message.contains("more than 24 hours in the past"));
    }

    #[test]
    fn conflict_message_depends_on_active_flag() {
        let mut conflict = ConflictError {
            existing_assignment_id: Uuid::new_v4(),
            is_active: true,
            family_member_name: "Ada".to_string(),
            medication_name: "Ibuprofen".to_string(),
        };
        assert!(conflict.message().starts_with("an active"));

        conflict.is_active = false;
        assert!(conflict.message().contains("reactivate"));
    }

    #[test]
    fn engine_error_codes_are_stable() {
        let err = EngineError::from(ValidationError::FutureTimestamp);
        assert_eq!(err.code(), "validation_error");
    }
}
