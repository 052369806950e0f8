//! Read-only collaborator contracts the engine is fed from.
//!
//! Storage adapters implement these; engine functions only ever see the
//! values they return.

use super::conflict::ExistingAssignment;
use crate::model::assignment::AssignmentIdentity;
use crate::model::AssignmentId;
use chrono::{DateTime, Utc};

/// Most recent administration instant of an assignment.
pub trait AdministrationLookup {
    type Error;

    /// Returns `None` when the assignment has never been administered.
    fn last_administered_at(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Option<DateTime<Utc>>, Self::Error>;
}

/// Existing assignment by identity pair, regardless of active flag.
pub trait AssignmentIdentityLookup {
    type Error;

    fn find_by_identity(
        &self,
        identity: &AssignmentIdentity,
    ) -> Result<Option<ExistingAssignment>, Self::Error>;
}
