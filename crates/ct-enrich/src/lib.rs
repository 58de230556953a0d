//! # ct-enrich
//!
//! The daily enrichment job for Commitment Tracker goals.
//!
//! One run scans every goal in a [`GoalStore`](ct_goal::GoalStore), builds a
//! prompt from each goal's name, target date, and progress, asks a
//! [`MessageGenerator`] for a short motivational message, and writes the
//! message plus its timestamp back to the record. Records are independent:
//! a failure on one is counted and the run moves on.
//!
//! ## Key components
//!
//! - [`Enricher`] — the run loop; returns a [`RunReport`]
//! - [`MessageGenerator`] — text generation seam; [`HttpGenerator`] is the
//!   hosted-model implementation
//! - [`RetryPolicy`] — bounded exponential backoff for transient failures
//! - [`RecordState`] — per-record state machine, reported as [`EnrichmentEvent`]s
//! - [`EnrichConfig`] — `.ct/enrich.toml` settings

pub mod config;
pub mod enricher;
pub mod error;
pub mod events;
pub mod generator;
pub mod http;
pub mod prompt;
pub mod record;
pub mod retry;
pub mod summary;

pub use config::{EnrichConfig, GeneratorConfig, Provider, RetryConfig, TrackerConfig};
pub use enricher::Enricher;
pub use error::{ConfigError, EnrichError, GenerationError};
pub use events::{EnrichmentEvent, EventDispatcher, NotificationSink, TracingSink};
pub use generator::MessageGenerator;
pub use http::HttpGenerator;
pub use prompt::build_prompt;
pub use record::{FailureReason, RecordState};
pub use retry::{generate_with_retry, RetryPolicy};
pub use summary::{FailureCounts, RunReport, RunSummary};
