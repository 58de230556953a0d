// record.rs — Per-record state machine for one enrichment run.
//
// Every record moves independently through:
//
//   Pending → PromptBuilt → Generated → Persisted
//                 │             ├──→ SkippedMissing  (deleted before update)
//                 │             └──→ Failed(conflict | store_error)
//                 └──→ Failed(transient_exhausted | permanent)
//   Pending → Failed(unreadable)   (the scan could not decode the record)
//
// Persisted, SkippedMissing, and Failed are terminal. States are strictly
// local to one record; the only cross-record state is the run summary.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{EnrichmentEvent, EventDispatcher};

/// Why a record did not get a new message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Transient generation failures used up every attempt.
    TransientExhausted,
    /// The generator rejected the request outright.
    Permanent,
    /// The record was edited after the scan; left for the next run.
    Conflict,
    /// The store returned an error on update.
    StoreError,
    /// The record could not be read during the scan.
    Unreadable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::TransientExhausted => write!(f, "transient_exhausted"),
            FailureReason::Permanent => write!(f, "permanent"),
            FailureReason::Conflict => write!(f, "conflict"),
            FailureReason::StoreError => write!(f, "store_error"),
            FailureReason::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// Where a record is within the current run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    Pending,
    PromptBuilt,
    Generated,
    Persisted,
    Failed { reason: FailureReason },
    SkippedMissing,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Pending => write!(f, "pending"),
            RecordState::PromptBuilt => write!(f, "prompt_built"),
            RecordState::Generated => write!(f, "generated"),
            RecordState::Persisted => write!(f, "persisted"),
            RecordState::Failed { reason } => write!(f, "failed({})", reason),
            RecordState::SkippedMissing => write!(f, "skipped_missing"),
        }
    }
}

impl RecordState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordState::Persisted | RecordState::Failed { .. } | RecordState::SkippedMissing
        )
    }

    /// Check whether moving from this state to `next` is a valid step.
    pub fn can_transition_to(&self, next: &RecordState) -> bool {
        use FailureReason::*;
        use RecordState::*;

        matches!(
            (self, next),
            (Pending, PromptBuilt)
                | (Pending, Failed { reason: Unreadable })
                | (PromptBuilt, Generated)
                | (PromptBuilt, Failed { reason: TransientExhausted | Permanent })
                | (Generated, Persisted)
                | (Generated, SkippedMissing)
                | (Generated, Failed { reason: Conflict | StoreError })
        )
    }
}

/// One record's progress through a run, reporting each step to the
/// event dispatcher.
pub struct RecordRun<'a> {
    run_id: Uuid,
    goal_id: String,
    state: RecordState,
    events: &'a EventDispatcher,
}

impl<'a> RecordRun<'a> {
    pub fn new(run_id: Uuid, goal_id: impl Into<String>, events: &'a EventDispatcher) -> Self {
        Self {
            run_id,
            goal_id: goal_id.into(),
            state: RecordState::Pending,
            events,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Move to `next`. The orchestrator only ever drives valid sequences,
    /// so an invalid step is a bug.
    pub fn advance(&mut self, next: RecordState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid record transition {} -> {} for {}",
            self.state,
            next,
            self.goal_id
        );
        self.events.dispatch(&EnrichmentEvent::RecordStateChanged {
            run_id: self.run_id,
            goal_id: self.goal_id.clone(),
            from_state: self.state.to_string(),
            to_state: next.to_string(),
            timestamp: Utc::now(),
        });
        self.state = next;
    }
}
