// goal.rs — Goal: the tracked commitment record.
//
// Goals are created, edited, and deleted by the CRUD surface. The enrichment
// job only reads three descriptive fields and writes the two enrichment
// fields. Everything else rides along in `extra` so a rewrite by the store
// never drops attributes it doesn't know about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GoalError;
use crate::store::{EnrichmentUpdate, UpdateOutcome};

/// Longest identifier the store will accept.
const MAX_GOAL_ID_LEN: usize = 128;

/// A goal record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    /// Unique, immutable identifier (e.g., "goal-20250101120000").
    pub goal_id: String,

    /// Owner of the goal. Only used for lookups by the CRUD surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Human-readable goal name (e.g., "Exercise").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_name: Option<String>,

    /// Target date as entered by the user. Never parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,

    /// Free-text progress description (e.g., "3 of 7 days").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_details: Option<String>,

    /// Most recent generated message. Absent until the first enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivational_message: Option<String>,

    /// When `motivational_message` was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_encouragement_date: Option<DateTime<Utc>>,

    /// Revision marker bumped by the CRUD surface on every edit.
    /// Enrichment never touches it; the store compares it to detect edits
    /// that happened after a scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Attributes the enrichment job never reads or writes (category,
    /// priority, status, milestones, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Goal {
    /// Create a bare goal with only an id and a name.
    pub fn new(goal_id: impl Into<String>, goal_name: impl Into<String>) -> Self {
        Self {
            goal_id: goal_id.into(),
            user_id: None,
            goal_name: Some(goal_name.into()),
            target_date: None,
            progress_details: None,
            motivational_message: None,
            last_encouragement_date: None,
            updated_at: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_target_date(mut self, target_date: impl Into<String>) -> Self {
        self.target_date = Some(target_date.into());
        self
    }

    pub fn with_progress(mut self, progress_details: impl Into<String>) -> Self {
        self.progress_details = Some(progress_details.into());
        self
    }

    /// Whether the goal has been enriched at least once.
    pub fn is_enriched(&self) -> bool {
        self.motivational_message.is_some() && self.last_encouragement_date.is_some()
    }

    /// Apply an enrichment update to this record if it is still current.
    ///
    /// Returns `Conflict` without modifying anything when the record was
    /// edited since the update's snapshot was taken, or when the stored
    /// timestamp is already newer than the incoming one. Otherwise message
    /// and timestamp are replaced together.
    pub fn apply_enrichment(&mut self, update: &EnrichmentUpdate) -> UpdateOutcome {
        if self.updated_at != update.expected_updated_at {
            return UpdateOutcome::Conflict;
        }
        if self
            .last_encouragement_date
            .is_some_and(|stored| stored > update.timestamp)
        {
            return UpdateOutcome::Conflict;
        }
        self.motivational_message = Some(update.message.clone());
        self.last_encouragement_date = Some(update.timestamp);
        UpdateOutcome::Updated
    }
}

/// Check that an identifier can safely name a record (it doubles as a file
/// stem in the JSON file store).
pub fn validate_goal_id(goal_id: &str) -> Result<(), GoalError> {
    let valid = !goal_id.is_empty()
        && goal_id.len() <= MAX_GOAL_ID_LEN
        && !goal_id.starts_with('.')
        && goal_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(GoalError::InvalidGoalId(goal_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn update_for(goal: &Goal, message: &str, timestamp: DateTime<Utc>) -> EnrichmentUpdate {
        EnrichmentUpdate::for_goal(goal, message, timestamp)
    }

    #[test]
    fn new_goal_is_not_enriched() {
        let goal = Goal::new("g1", "Exercise");
        assert_eq!(goal.goal_name.as_deref(), Some("Exercise"));
        assert!(!goal.is_enriched());
    }

    #[test]
    fn apply_enrichment_sets_both_fields() {
        let mut goal = Goal::new("g1", "Exercise");
        let now = Utc::now();
        let update = update_for(&goal, "Keep going!", now);

        assert_eq!(goal.apply_enrichment(&update), UpdateOutcome::Updated);
        assert_eq!(goal.motivational_message.as_deref(), Some("Keep going!"));
        assert_eq!(goal.last_encouragement_date, Some(now));
        assert!(goal.is_enriched());
    }

    #[test]
    fn apply_enrichment_conflicts_after_edit() {
        let mut goal = Goal::new("g1", "Exercise");
        goal.updated_at = Some("2025-01-01T00:00:00".to_string());
        let update = update_for(&goal, "Keep going!", Utc::now());

        // The CRUD surface edits the record after the snapshot was taken.
        goal.updated_at = Some("2025-01-02T00:00:00".to_string());

        assert_eq!(goal.apply_enrichment(&update), UpdateOutcome::Conflict);
        assert!(goal.motivational_message.is_none());
        assert!(goal.last_encouragement_date.is_none());
    }

    #[test]
    fn apply_enrichment_rejects_older_timestamp() {
        let mut goal = Goal::new("g1", "Exercise");
        let now = Utc::now();
        let first = update_for(&goal, "newer", now);
        goal.apply_enrichment(&first);

        let stale = update_for(&goal, "older", now - Duration::seconds(10));
        assert_eq!(goal.apply_enrichment(&stale), UpdateOutcome::Conflict);
        assert_eq!(goal.motivational_message.as_deref(), Some("newer"));
        assert_eq!(goal.last_encouragement_date, Some(now));
    }

    #[test]
    fn apply_enrichment_accepts_equal_timestamp() {
        let mut goal = Goal::new("g1", "Exercise");
        let now = Utc::now();
        let first = update_for(&goal, "first", now);
        goal.apply_enrichment(&first);

        let again = update_for(&goal, "second", now);
        assert_eq!(goal.apply_enrichment(&again), UpdateOutcome::Updated);
        assert_eq!(goal.motivational_message.as_deref(), Some("second"));
    }

    #[test]
    fn opaque_attributes_survive_round_trip() {
        let json = r#"{
            "goal_id": "goal-1",
            "goal_name": "Read",
            "goal_category": "Learning",
            "priority": "High",
            "progress_percentage": 40,
            "milestones": "Finish book 1"
        }"#;
        let goal: Goal = serde_json::from_str(json).unwrap();
        assert_eq!(goal.extra.len(), 4);
        assert_eq!(goal.extra["progress_percentage"], 40);

        let out = serde_json::to_value(&goal).unwrap();
        assert_eq!(out["goal_category"], "Learning");
        assert_eq!(out["milestones"], "Finish book 1");
        assert!(out.get("motivational_message").is_none());
    }

    #[test]
    fn missing_optional_fields_deserialize_as_none() {
        let goal: Goal = serde_json::from_str(r#"{"goal_id": "g2"}"#).unwrap();
        assert!(goal.goal_name.is_none());
        assert!(goal.target_date.is_none());
        assert!(goal.progress_details.is_none());
        assert!(goal.extra.is_empty());
    }

    #[test]
    fn goal_id_validation() {
        assert!(validate_goal_id("goal-20250101120000").is_ok());
        assert!(validate_goal_id("g_1.v2").is_ok());
        assert!(validate_goal_id("").is_err());
        assert!(validate_goal_id("../etc/passwd").is_err());
        assert!(validate_goal_id(".hidden").is_err());
        assert!(validate_goal_id("has space").is_err());
        assert!(validate_goal_id(&"x".repeat(129)).is_err());
    }
}
