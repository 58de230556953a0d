// summary.rs — Run summary and the structured result of an invocation.

use serde::{Deserialize, Serialize};

use crate::record::{FailureReason, RecordState};

/// Failure counts broken down by reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureCounts {
    pub transient_exhausted: usize,
    pub permanent: usize,
    pub conflict: usize,
    pub store_error: usize,
    pub unreadable: usize,
}

impl FailureCounts {
    pub fn get(&self, reason: FailureReason) -> usize {
        match reason {
            FailureReason::TransientExhausted => self.transient_exhausted,
            FailureReason::Permanent => self.permanent,
            FailureReason::Conflict => self.conflict,
            FailureReason::StoreError => self.store_error,
            FailureReason::Unreadable => self.unreadable,
        }
    }

    fn increment(&mut self, reason: FailureReason) {
        let slot = match reason {
            FailureReason::TransientExhausted => &mut self.transient_exhausted,
            FailureReason::Permanent => &mut self.permanent,
            FailureReason::Conflict => &mut self.conflict,
            FailureReason::StoreError => &mut self.store_error,
            FailureReason::Unreadable => &mut self.unreadable,
        };
        *slot += 1;
    }
}

/// Aggregate outcome of one run.
///
/// `seen == persisted + failed + skipped` always holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    /// Records pulled from the scan and attempted.
    pub seen: usize,
    pub persisted: usize,
    pub failed: usize,
    /// Records deleted between scan and update.
    pub skipped: usize,
    pub failures: FailureCounts,
    /// The run budget ran out before the scan was finished.
    pub budget_exhausted: bool,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Count one record's terminal state. Non-terminal states are not
    /// counted at all, so the totals always add up.
    pub fn record(&mut self, state: &RecordState) {
        match state {
            RecordState::Persisted => self.persisted += 1,
            RecordState::SkippedMissing => self.skipped += 1,
            RecordState::Failed { reason } => {
                self.failed += 1;
                self.failures.increment(*reason);
            }
            RecordState::Pending | RecordState::PromptBuilt | RecordState::Generated => return,
        }
        self.seen += 1;
    }
}

/// What the entry point returns: `{"processedCount": n, "results": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub processed_count: usize,
    pub results: RunSummary,
}

impl From<RunSummary> for RunReport {
    fn from(summary: RunSummary) -> Self {
        Self {
            processed_count: summary.seen,
            results: summary,
        }
    }
}
