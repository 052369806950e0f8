//! Frequency specs and default/override resolution.
//!
//! # Responsibility
//! - Validate stored frequency fields as standalone specs.
//! - Resolve the effective frequency of an assignment from the medication
//!   default and the assignment override.
//!
//! # Invariants
//! - A resolved `FrequencySpec` is exactly one of fixed or range.
//! - Range specs satisfy `0 < min_hours < max_hours`.
//! - An override that supplies any value replaces the default wholesale.

use super::error::{ConfigurationError, ValidationError};
use serde::{Deserialize, Serialize};

/// Canonical dosing interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrequencySpec {
    /// One dose every `hours`.
    Fixed { hours: f64 },
    /// Next dose allowed after `min_hours`, due by `max_hours`.
    Range { min_hours: f64, max_hours: f64 },
}

/// Discriminant of a `FrequencySpec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyKind {
    Fixed,
    Range,
}

impl FrequencySpec {
    /// Builds a validated fixed spec.
    pub fn fixed(hours: f64) -> Result<Self, ValidationError> {
        check_hours(hours)?;
        Ok(Self::Fixed { hours })
    }

    /// Builds a validated range spec.
    pub fn range(min_hours: f64, max_hours: f64) -> Result<Self, ValidationError> {
        check_range(min_hours, max_hours)?;
        Ok(Self::Range {
            min_hours,
            max_hours,
        })
    }

    pub fn kind(&self) -> FrequencyKind {
        match self {
            Self::Fixed { .. } => FrequencyKind::Fixed,
            Self::Range { .. } => FrequencyKind::Range,
        }
    }
}

/// Nullable frequency columns as stored on medications and assignments.
///
/// Used both for medication defaults (must resolve to a spec) and for
/// assignment overrides (may be entirely empty).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFields {
    pub hours: Option<f64>,
    pub min_hours: Option<f64>,
    pub max_hours: Option<f64>,
}

impl FrequencyFields {
    pub fn fixed(hours: f64) -> Self {
        Self {
            hours: Some(hours),
            ..Self::default()
        }
    }

    pub fn range(min_hours: f64, max_hours: f64) -> Self {
        Self {
            hours: None,
            min_hours: Some(min_hours),
            max_hours: Some(max_hours),
        }
    }

    /// True when no field is populated ("inherit" for overrides).
    pub fn is_empty(&self) -> bool {
        self.hours.is_none() && self.min_hours.is_none() && self.max_hours.is_none()
    }

    fn complete_range(&self) -> Option<(f64, f64)> {
        match (self.min_hours, self.max_hours) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    fn has_range_bound(&self) -> bool {
        self.min_hours.is_some() || self.max_hours.is_some()
    }

    /// Validates these fields as a medication default.
    ///
    /// Exactly one of fixed hours or a complete range must be present.
    pub fn validate_as_default(&self) -> Result<FrequencySpec, ValidationError> {
        self.check_shape()?.ok_or(ValidationError::MissingFrequency)
    }

    /// Validates these fields as an assignment override.
    ///
    /// An empty override is valid. A lone range bound passes validation and
    /// is rejected later by `resolve_frequency`.
    pub fn validate_as_override(&self) -> Result<(), ValidationError> {
        self.check_shape().map(|_| ())
    }

    fn check_shape(&self) -> Result<Option<FrequencySpec>, ValidationError> {
        match (self.hours, self.complete_range()) {
            (Some(_), Some(_)) => Err(ValidationError::BothFrequencies),
            (None, Some((min, max))) => FrequencySpec::range(min, max).map(Some),
            (Some(hours), None) => FrequencySpec::fixed(hours).map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// Resolves the effective frequency of an assignment.
///
/// The override wins wholesale when it carries any value; otherwise the
/// medication default applies. Values are assumed to have passed the
/// construction-time validation, so only completeness is checked here.
pub fn resolve_frequency(
    medication_default: &FrequencyFields,
    assignment_override: &FrequencyFields,
) -> Result<FrequencySpec, ConfigurationError> {
    if let Some((min_hours, max_hours)) = assignment_override.complete_range() {
        return Ok(FrequencySpec::Range {
            min_hours,
            max_hours,
        });
    }

    if !assignment_override.is_empty() {
        if assignment_override.has_range_bound() {
            return Err(ConfigurationError::IncompleteRangeOverride);
        }
        return match assignment_override.hours {
            Some(hours) => Ok(FrequencySpec::Fixed { hours }),
            None => Err(ConfigurationError::FrequencyNotConfigured),
        };
    }

    if let Some((min_hours, max_hours)) = medication_default.complete_range() {
        return Ok(FrequencySpec::Range {
            min_hours,
            max_hours,
        });
    }

    match medication_default.hours {
        Some(hours) => Ok(FrequencySpec::Fixed { hours }),
        None => Err(ConfigurationError::FrequencyNotConfigured),
    }
}

fn check_hours(hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() {
        return Err(ValidationError::NonFiniteHours);
    }
    if hours <= 0.0 {
        return Err(ValidationError::NonPositiveHours);
    }
    Ok(())
}

fn check_range(min_hours: f64, max_hours: f64) -> Result<(), ValidationError> {
    if !min_hours.is_finite() || !max_hours.is_finite() {
        return Err(ValidationError::NonFiniteHours);
    }
    if min_hours >= max_hours {
        return Err(ValidationError::RangeNotIncreasing);
    }
    if min_hours <= 0.0 || max_hours <= 0.0 {
        return Err(ValidationError::NonPositiveHours);
    }
    Ok(())
}
