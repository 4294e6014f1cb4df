//! World records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An isolated, independently-owned partition of the statement/chunk store.
///
/// Operations scoped to one world never observe or mutate another world's
/// rows. `deleted_at` is a soft delete: the world is retired but its rows
/// remain until a separate reclamation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct World {
    /// Primary identifier.
    pub world_id: String,
    /// Owning account.
    pub account_id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Non-null means retired.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Whether the world is publicly readable.
    pub is_public: bool,
}

impl World {
    /// Whether this world has been soft-deleted.
    pub fn is_retired(&self) -> bool {
        self.deleted_at.is_some()
    }
}
