// events.rs — Event model and notification dispatch for enrichment runs.
//
// The orchestrator emits an event when a run starts, on every per-record
// state change, and when the run completes. Sinks decide what to do with
// them; the default sink turns each one into a tracing record. A failing
// sink never affects the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::summary::RunSummary;

/// Events emitted during an enrichment run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EnrichmentEvent {
    /// A run began; the scan has not happened yet.
    RunStarted {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// One record moved to a new state.
    RecordStateChanged {
        run_id: Uuid,
        goal_id: String,
        from_state: String,
        to_state: String,
        timestamp: DateTime<Utc>,
    },

    /// A run finished (possibly cut short by its budget).
    RunCompleted {
        run_id: Uuid,
        summary: RunSummary,
        timestamp: DateTime<Utc>,
    },
}

impl EnrichmentEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            EnrichmentEvent::RunStarted { .. } => "run_started",
            EnrichmentEvent::RecordStateChanged { .. } => "record_state_changed",
            EnrichmentEvent::RunCompleted { .. } => "run_completed",
        }
    }

    pub fn run_started(run_id: Uuid) -> Self {
        EnrichmentEvent::RunStarted {
            run_id,
            timestamp: Utc::now(),
        }
    }

    pub fn run_completed(run_id: Uuid, summary: &RunSummary) -> Self {
        EnrichmentEvent::RunCompleted {
            run_id,
            summary: summary.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives enrichment events.
pub trait NotificationSink: Send {
    /// Handle an event. Errors are logged but don't stop the run.
    fn send(&self, event: &EnrichmentEvent) -> Result<(), String>;
}

/// Emits every event as a tracing record (always-on sink).
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn send(&self, event: &EnrichmentEvent) -> Result<(), String> {
        match event {
            EnrichmentEvent::RunStarted { run_id, .. } => {
                tracing::info!(%run_id, "enrichment run started");
            }
            EnrichmentEvent::RecordStateChanged {
                goal_id,
                from_state,
                to_state,
                ..
            } => {
                tracing::debug!(goal_id = %goal_id, from = %from_state, to = %to_state, "record state changed");
            }
            EnrichmentEvent::RunCompleted {
                run_id, summary, ..
            } => {
                tracing::info!(
                    %run_id,
                    seen = summary.seen,
                    persisted = summary.persisted,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    budget_exhausted = summary.budget_exhausted,
                    "enrichment run completed"
                );
            }
        }
        Ok(())
    }
}

/// Dispatches events to multiple sinks.
///
/// Errors from individual sinks are logged (via tracing) but don't
/// prevent other sinks from receiving the event.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    /// Create a new dispatcher with no sinks.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// A dispatcher with just the tracing sink.
    pub fn with_tracing() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.add_sink(Box::new(TracingSink));
        dispatcher
    }

    /// Add a notification sink.
    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// Dispatch an event to all sinks.
    pub fn dispatch(&self, event: &EnrichmentEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event_type = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Keeps every event it receives; clones share the same buffer.
    #[derive(Clone, Default)]
    pub(crate) struct CollectingSink {
        events: Arc<Mutex<Vec<EnrichmentEvent>>>,
    }

    impl CollectingSink {
        pub(crate) fn events(&self) -> Vec<EnrichmentEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl NotificationSink for CollectingSink {
        fn send(&self, event: &EnrichmentEvent) -> Result<(), String> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CollectingSink;
    use super::*;

    struct BrokenSink;

    impl NotificationSink for BrokenSink {
        fn send(&self, _event: &EnrichmentEvent) -> Result<(), String> {
            Err("sink offline".to_string())
        }
    }

    #[test]
    fn event_serialization_round_trip() {
        let event = EnrichmentEvent::run_started(Uuid::new_v4());
        let json = serde_json::to_string(&event).unwrap();
        let restored: EnrichmentEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event, restored);
        assert!(json.contains("\"run_started\""));
    }

    #[test]
    fn dispatcher_sends_to_all_sinks() {
        let first = CollectingSink::default();
        let second = CollectingSink::default();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(first.clone()));
        dispatcher.add_sink(Box::new(second.clone()));

        dispatcher.dispatch(&EnrichmentEvent::run_started(Uuid::new_v4()));

        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 1);
    }

    #[test]
    fn broken_sink_does_not_block_others() {
        let healthy = CollectingSink::default();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(BrokenSink));
        dispatcher.add_sink(Box::new(healthy.clone()));

        dispatcher.dispatch(&EnrichmentEvent::run_completed(
            Uuid::new_v4(),
            &RunSummary::default(),
        ));

        assert_eq!(healthy.events().len(), 1);
    }

    #[test]
    fn event_type_names() {
        let id = Uuid::new_v4();
        assert_eq!(EnrichmentEvent::run_started(id).event_type(), "run_started");
        assert_eq!(
            EnrichmentEvent::run_completed(id, &RunSummary::default()).event_type(),
            "run_completed"
        );
    }
}
