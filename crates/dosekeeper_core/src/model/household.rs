//! Family members and caregivers.
//!
//! Both are soft-deletable name records; inactive rows stay referenced by
//! historical assignments and administrations.

use super::{CaregiverId, FamilyMemberId};
use crate::engine::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Person who receives medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: FamilyMemberId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Person who logs or gives doses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caregiver {
    pub id: CaregiverId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl FamilyMember {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: non_empty_name(name.into())?,
            active: true,
            created_at,
        })
    }
}

impl Caregiver {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: non_empty_name(name.into())?,
            active: true,
            created_at,
        })
    }
}

pub(crate) fn non_empty_name(name: String) -> Result<String, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    Ok(name)
}
