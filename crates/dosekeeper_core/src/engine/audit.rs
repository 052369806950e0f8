//! Assignment change auditing.
//!
//! # Responsibility
//! - Apply a sparse patch to assignment fields.
//! - Emit one audit entry per supplied field whose text form changed.
//!
//! # Invariants
//! - Comparison uses the audit text form, not structural equality.
//! - Entries follow `AssignmentFields` declaration order.
//! - Any validation failure rejects the whole patch: no entries, no mutation.

use super::error::ValidationError;
use crate::model::assignment::{validate_schedule, AssignmentFields, AssignmentPatch};
use crate::model::patch::FieldPatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One field change on an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Text form used for audit comparison and storage.
///
/// `None` maps to the null marker, never to the text `"null"`.
pub trait AuditText {
    fn audit_text(&self) -> Option<String>;
}

impl AuditText for String {
    fn audit_text(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl AuditText for f64 {
    /// Shortest round-trip form with a trailing `.0` for integral values.
    ///
    /// Magnitudes below `1e-4` or from `1e16` up use exponent notation with a
    /// signed, two-digit-minimum exponent (`1e+16`, `5e-05`).
    fn audit_text(&self) -> Option<String> {
        Some(float_text(*self))
    }
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    // `Debug` already switches to exponent form at the same magnitudes.
    let text = format!("{value:?}");
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

impl AuditText for bool {
    fn audit_text(&self) -> Option<String> {
        Some(if *self { "True" } else { "False" }.to_string())
    }
}

impl<T: AuditText> AuditText for Option<T> {
    fn audit_text(&self) -> Option<String> {
        self.as_ref().and_then(AuditText::audit_text)
    }
}

/// Applies `patch` to `current` and returns the new fields with their audit
/// trail.
///
/// When any frequency field is supplied, the merged frequency override must
/// still be fixed-xor-range. Supplied schedule values must be well formed.
pub fn diff_for_audit(
    current: &AssignmentFields,
    patch: &AssignmentPatch,
    changed_at: DateTime<Utc>,
) -> Result<(AssignmentFields, Vec<AuditEntry>), ValidationError> {
    if patch.touches_frequency() {
        let merged = patch.merged_frequency(current);
        merged.validate_as_override()?;
    }
    validate_schedule(
        patch.schedule_type.value().map(String::as_str),
        patch.schedule_time.value().map(String::as_str),
        patch.schedule_days.value().map(String::as_str),
    )?;
    let active = match patch.active {
        FieldPatch::Unset => None,
        FieldPatch::Null => return Err(ValidationError::NullField("active")),
        FieldPatch::Value(value) => Some(value),
    };

    let mut next = current.clone();
    let mut entries = Vec::new();
    let mut recorder = Recorder {
        entries: &mut entries,
        changed_at,
    };

    recorder.nullable("current_dose", &mut next.current_dose, &patch.current_dose);
    recorder.nullable(
        "frequency_hours",
        &mut next.frequency_hours,
        &patch.frequency_hours,
    );
    recorder.nullable(
        "frequency_min_hours",
        &mut next.frequency_min_hours,
        &patch.frequency_min_hours,
    );
    recorder.nullable(
        "frequency_max_hours",
        &mut next.frequency_max_hours,
        &patch.frequency_max_hours,
    );
    if let Some(value) = active {
        recorder.apply("active", &mut next.active, value);
    }
    recorder.nullable("schedule_type", &mut next.schedule_type, &patch.schedule_type);
    recorder.nullable("schedule_time", &mut next.schedule_time, &patch.schedule_time);
    recorder.nullable("schedule_days", &mut next.schedule_days, &patch.schedule_days);

    Ok((next, entries))
}

struct Recorder<'a> {
    entries: &'a mut Vec<AuditEntry>,
    changed_at: DateTime<Utc>,
}

impl Recorder<'_> {
    fn nullable<T>(&mut self, field: &str, slot: &mut Option<T>, patch: &FieldPatch<T>)
    where
        T: AuditText + Clone,
    {
        match patch {
            FieldPatch::Unset => {}
            FieldPatch::Null => self.apply(field, slot, None),
            FieldPatch::Value(value) => self.apply(field, slot, Some(value.clone())),
        }
    }

    fn apply<T: AuditText>(&mut self, field: &str, slot: &mut T, value: T) {
        let old_value = slot.audit_text();
        let new_value = value.audit_text();
        if old_value != new_value {
            self.entries.push(AuditEntry {
                field_name: field.to_string(),
                old_value,
                new_value,
                changed_at: self.changed_at,
            });
        }
        *slot = value;
    }
}
