//! # ct-goal
//!
//! Goal records and the store interface for Commitment Tracker.
//!
//! A [`Goal`] is a tracked commitment (name, target date, progress) plus the
//! two enrichment fields the daily job writes: a motivational message and
//! the time it was generated.
//!
//! ## Key components
//!
//! - [`Goal`] — the record shape, with unknown attributes kept opaque
//! - [`GoalStore`] — lazy scan plus single-record enrichment update
//! - [`JsonFileGoalStore`] — one JSON file per goal in a directory
//! - [`UpdateOutcome`] — `Updated`, `NotFound`, or `Conflict`

pub mod error;
pub mod file_store;
pub mod goal;
pub mod store;

pub use error::GoalError;
pub use file_store::JsonFileGoalStore;
pub use goal::{validate_goal_id, Goal};
pub use store::{EnrichmentUpdate, GoalScan, GoalStore, UpdateOutcome};
