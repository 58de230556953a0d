// store.rs — GoalStore: the narrow store interface the enrichment job needs.
//
// Two operations: a lazy scan over every record, and a single-record update
// of the enrichment fields. Anything else (create, edit, delete) belongs to
// the CRUD surface and is not part of this trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GoalError;
use crate::goal::Goal;

/// A lazy sequence of goal snapshots.
///
/// Each item is one record; an `Err` item means that one record could not
/// be read and the scan goes on with the next.
pub type GoalScan<'a> = Box<dyn Iterator<Item = Result<Goal, GoalError>> + 'a>;

/// The enrichment fields to write for one goal.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentUpdate {
    pub goal_id: String,

    /// The `updated_at` marker observed in the scanned snapshot. The store
    /// reports `Conflict` if the record has moved on since.
    pub expected_updated_at: Option<String>,

    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl EnrichmentUpdate {
    /// Build an update against the given snapshot.
    pub fn for_goal(goal: &Goal, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            goal_id: goal.goal_id.clone(),
            expected_updated_at: goal.updated_at.clone(),
            message: message.into(),
            timestamp,
        }
    }
}

/// What happened to an enrichment update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Message and timestamp were written.
    Updated,
    /// The record no longer exists.
    NotFound,
    /// The record changed after it was scanned; nothing was written.
    Conflict,
}

/// Store access required by the enrichment job.
pub trait GoalStore: Send + Sync {
    /// Start a scan over every goal record.
    ///
    /// An `Err` here means the store itself is unreachable and no records
    /// can be observed at all.
    fn scan(&self) -> Result<GoalScan<'_>, GoalError>;

    /// Write message and timestamp for one goal, in place.
    ///
    /// `NotFound` and `Conflict` are normal outcomes, not errors.
    fn update_enrichment(&self, update: &EnrichmentUpdate) -> Result<UpdateOutcome, GoalError>;

    /// Store display name (for logs).
    fn name(&self) -> &str;
}
