//! Three-state field updates for sparse patches.

use serde::{Deserialize, Deserializer};

/// One field of a sparse update.
///
/// Distinguishes "not supplied" from "supplied as null". With
/// `#[serde(default)]` on the containing struct, a missing JSON key
/// deserializes to `Unset` and an explicit `null` to `Null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> FieldPatch<T> {
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Supplied non-null value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Clone> FieldPatch<T> {
    /// Value the field would hold after applying this patch to `current`.
    pub fn proposed(&self, current: &Option<T>) -> Option<T> {
        match self {
            Self::Unset => current.clone(),
            Self::Null => None,
            Self::Value(value) => Some(value.clone()),
        }
    }
}

impl<T> From<Option<T>> for FieldPatch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldPatch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::FieldPatch;

    #[test]
    fn proposed_applies_three_states() {
        let current = Some(4.0);
        assert_eq!(FieldPatch::Unset.proposed(&current), Some(4.0));
        assert_eq!(FieldPatch::<f64>::Null.proposed(&current), None);
        assert_eq!(FieldPatch::Value(6.0).proposed(&current), Some(6.0));
    }

    #[test]
    fn option_converts_to_null_or_value() {
        assert_eq!(FieldPatch::from(None::<String>), FieldPatch::Null);
        assert_eq!(FieldPatch::from(Some(1)), FieldPatch::Value(1));
        assert!(!FieldPatch::<i32>::Unset.is_set());
    }
}
