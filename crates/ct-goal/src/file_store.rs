// file_store.rs — JsonFileGoalStore: goal records as JSON files.
//
// Each goal is stored as `<store_dir>/<goal_id>.json`. Writes go to a
// uniquely named hidden temp file first and are renamed into place, so a
// concurrent reader sees either the old record or the new one, never a
// partial write.
//
// Every mutation (save, delete, update_enrichment) holds an exclusive lock
// on `<store_dir>/.store.lock` from its read through its rename. Without it
// an edit landing between the conflict check and the rename would be
// overwritten by the stale snapshot. Readers never take the lock.
//
// `scan` lists file names up front (sorted, so order is stable between
// runs) and reads records one at a time as the iterator is pulled.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::GoalError;
use crate::goal::{validate_goal_id, Goal};
use crate::store::{EnrichmentUpdate, GoalScan, GoalStore, UpdateOutcome};

/// Lock file serializing writers. Dot-prefixed so scans skip it.
const LOCK_FILE: &str = ".store.lock";

/// Persistent store for goal records.
pub struct JsonFileGoalStore {
    store_dir: PathBuf,
}

impl JsonFileGoalStore {
    /// Create a store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, GoalError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| GoalError::IoError {
            path: store_dir.display().to_string(),
            source,
        })?;
        Ok(Self { store_dir })
    }

    /// Open an existing store directory without creating it.
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self, GoalError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        if !store_dir.is_dir() {
            return Err(GoalError::StoreUnavailable {
                path: store_dir.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self { store_dir })
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Save a goal (creates or overwrites). Used by the CRUD surface and
    /// by fixtures; the enrichment job only calls `update_enrichment`.
    pub fn save(&self, goal: &Goal) -> Result<(), GoalError> {
        validate_goal_id(&goal.goal_id)?;
        let _lock = self.lock()?;
        self.write_record(goal)
    }

    /// Get a specific goal by ID.
    pub fn get(&self, goal_id: &str) -> Result<Option<Goal>, GoalError> {
        validate_goal_id(goal_id)?;
        read_record(&self.goal_file(goal_id))
    }

    /// Delete a goal from the store.
    pub fn delete(&self, goal_id: &str) -> Result<bool, GoalError> {
        validate_goal_id(goal_id)?;
        let path = self.goal_file(goal_id);
        let _lock = self.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(GoalError::IoError {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Path to the JSON file for a given goal.
    fn goal_file(&self, goal_id: &str) -> PathBuf {
        self.store_dir.join(format!("{}.json", goal_id))
    }

    /// Take the store-wide writer lock. Released when the returned file
    /// is dropped.
    fn lock(&self) -> Result<File, GoalError> {
        let path = self.store_dir.join(LOCK_FILE);
        let io_error = |source| GoalError::IoError {
            path: path.display().to_string(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_error)?;
        file.lock().map_err(io_error)?;
        Ok(file)
    }

    /// Write a record atomically. Callers hold the writer lock.
    fn write_record(&self, goal: &Goal) -> Result<(), GoalError> {
        let path = self.goal_file(&goal.goal_id);
        let json = serde_json::to_string_pretty(goal)?;
        let io_error = |at: &Path, source| GoalError::IoError {
            path: at.display().to_string(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&self.store_dir)
            .map_err(|e| io_error(self.store_dir.as_path(), e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| io_error(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| io_error(path.as_path(), e.error))?;
        Ok(())
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>, GoalError> {
        let unavailable = |reason: String| GoalError::StoreUnavailable {
            path: self.store_dir.display().to_string(),
            reason,
        };
        let entries = fs::read_dir(&self.store_dir).map_err(|e| unavailable(e.to_string()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| unavailable(e.to_string()))?.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'));
            if is_record {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Read one record. A file that vanished reads as `None`.
fn read_record(path: &Path) -> Result<Option<Goal>, GoalError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(GoalError::IoError {
                path: path.display().to_string(),
                source,
            })
        }
    };
    let goal = serde_json::from_str(&json).map_err(|source| GoalError::InvalidRecord {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(goal))
}

impl GoalStore for JsonFileGoalStore {
    fn scan(&self) -> Result<GoalScan<'_>, GoalError> {
        let paths = self.record_paths()?;
        tracing::debug!(
            store_dir = %self.store_dir.display(),
            records = paths.len(),
            "scanning goal store"
        );
        // Records deleted between listing and reading are dropped silently.
        Ok(Box::new(
            paths
                .into_iter()
                .filter_map(|path| read_record(&path).transpose()),
        ))
    }

    fn update_enrichment(&self, update: &EnrichmentUpdate) -> Result<UpdateOutcome, GoalError> {
        validate_goal_id(&update.goal_id)?;
        let _lock = self.lock()?;
        let Some(mut goal) = read_record(&self.goal_file(&update.goal_id))? else {
            return Ok(UpdateOutcome::NotFound);
        };

        let outcome = goal.apply_enrichment(update);
        if outcome == UpdateOutcome::Updated {
            self.write_record(&goal)?;
        }
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}
