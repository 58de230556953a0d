// enricher.rs — Enricher: the enrichment run over every goal.
//
// One run = one scan of the store. For each record, independently:
//   build prompt → generate (with retry) → update_enrichment
// and the terminal state is counted into the run summary. Nothing a single
// record does can stop the loop; only a failed scan aborts the run.
//
// Records are processed one at a time in scan order. No lock is held across
// the generation call; the store's NotFound/Conflict answers are the only
// coordination with concurrent editors or overlapping runs.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use ct_goal::{EnrichmentUpdate, Goal, GoalError, GoalStore, UpdateOutcome};
use uuid::Uuid;

use crate::config::EnrichConfig;
use crate::error::EnrichError;
use crate::events::{EnrichmentEvent, EventDispatcher};
use crate::generator::MessageGenerator;
use crate::prompt::build_prompt;
use crate::record::{FailureReason, RecordRun, RecordState};
use crate::retry::{generate_with_retry, RetryPolicy};
use crate::summary::{RunReport, RunSummary};

/// Default output bound passed to the generator.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Drives enrichment runs against a store and a generator.
pub struct Enricher<S, G> {
    store: S,
    generator: G,
    retry: RetryPolicy,
    max_tokens: u32,
    run_budget: Option<Duration>,
    events: EventDispatcher,
    sleeper: Sleeper,
}

impl<S: GoalStore, G: MessageGenerator> Enricher<S, G> {
    /// An enricher with default retry policy, output bound, and the tracing
    /// event sink. No run budget.
    pub fn new(store: S, generator: G) -> Self {
        Self {
            store,
            generator,
            retry: RetryPolicy::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
            run_budget: None,
            events: EventDispatcher::with_tracing(),
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// An enricher configured from `.ct/enrich.toml` settings.
    pub fn from_config(store: S, generator: G, config: &EnrichConfig) -> Self {
        let mut enricher = Self::new(store, generator)
            .with_retry_policy(config.retry.to_policy())
            .with_max_tokens(config.generator.max_tokens);
        enricher.run_budget = config.run_budget();
        enricher
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Stop starting new records once `budget` has elapsed.
    pub fn with_run_budget(mut self, budget: Duration) -> Self {
        self.run_budget = Some(budget);
        self
    }

    pub fn with_dispatcher(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Replace the backoff sleep (tests use this to avoid real waits).
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Run one enrichment pass over every goal in the store.
    ///
    /// Returns the report even when every record failed. The only error is
    /// a scan that could not start.
    pub fn run(&self) -> Result<RunReport, EnrichError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "enrichment_run",
            %run_id,
            store = self.store.name(),
            generator = self.generator.name()
        );
        let _guard = span.enter();

        let started = Instant::now();
        // A budget too large to represent is no budget.
        let deadline = self
            .run_budget
            .and_then(|budget| started.checked_add(budget));
        self.events.dispatch(&EnrichmentEvent::run_started(run_id));

        let goals = self.store.scan().map_err(|e| {
            tracing::error!(error = %e, "goal store scan failed, aborting run");
            EnrichError::Scan(e)
        })?;

        let mut summary = RunSummary::default();
        for item in goals {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(
                    seen = summary.seen,
                    "run budget exhausted, not starting further records"
                );
                summary.budget_exhausted = true;
                break;
            }

            let state = match item {
                Ok(goal) => self.enrich_goal(run_id, &goal, deadline),
                Err(e) => self.skip_unreadable(run_id, &e),
            };
            summary.record(&state);
        }

        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.events
            .dispatch(&EnrichmentEvent::run_completed(run_id, &summary));
        Ok(RunReport::from(summary))
    }

    /// A record the scan could not decode goes straight to Failed.
    fn skip_unreadable(&self, run_id: Uuid, error: &GoalError) -> RecordState {
        let record_id = unreadable_record_id(error);
        tracing::warn!(record = %record_id, error = %error, "skipping unreadable goal record");
        let mut record = RecordRun::new(run_id, record_id, &self.events);
        record.advance(RecordState::Failed {
            reason: FailureReason::Unreadable,
        });
        record.state()
    }

    /// Take one goal from Pending to a terminal state.
    fn enrich_goal(&self, run_id: Uuid, goal: &Goal, deadline: Option<Instant>) -> RecordState {
        let span = tracing::debug_span!("goal", goal_id = %goal.goal_id);
        let _guard = span.enter();
        let mut record = RecordRun::new(run_id, &goal.goal_id, &self.events);

        let prompt = build_prompt(goal);
        record.advance(RecordState::PromptBuilt);

        let generated = match generate_with_retry(
            &self.generator,
            &prompt,
            self.max_tokens,
            &self.retry,
            deadline,
            &*self.sleeper,
        ) {
            Ok(generated) => generated,
            Err(failure) => {
                tracing::warn!(
                    reason = %failure.reason,
                    attempts = failure.attempts,
                    error = %failure.last_error,
                    "generation failed"
                );
                record.advance(RecordState::Failed {
                    reason: failure.reason,
                });
                return record.state();
            }
        };
        record.advance(RecordState::Generated);

        let update = EnrichmentUpdate::for_goal(goal, generated.text, Utc::now());
        let next = match self.store.update_enrichment(&update) {
            Ok(UpdateOutcome::Updated) => {
                tracing::debug!(attempts = generated.attempts, "message persisted");
                RecordState::Persisted
            }
            Ok(UpdateOutcome::NotFound) => {
                tracing::info!("goal deleted before update, skipping");
                RecordState::SkippedMissing
            }
            Ok(UpdateOutcome::Conflict) => {
                tracing::info!("goal changed since scan, leaving for next run");
                RecordState::Failed {
                    reason: FailureReason::Conflict,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "store update failed");
                RecordState::Failed {
                    reason: FailureReason::StoreError,
                }
            }
        };
        record.advance(next);
        record.state()
    }
}

/// Best identifier for a record whose contents could not be read: the
/// file stem when the error names a path.
fn unreadable_record_id(error: &GoalError) -> String {
    match error {
        GoalError::IoError { path, .. }
        | GoalError::InvalidRecord { path, .. }
        | GoalError::StoreUnavailable { path, .. } => Path::new(path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone()),
        GoalError::InvalidGoalId(id) => id.clone(),
        GoalError::SerializationError(_) => "unknown".to_string(),
    }
}
