use chrono::{DateTime, Utc};
use run_tracker_lib::run::Run;

use crate::{storage::KeyValueStore, ArchiveError, RUNS_KEY};

/// The saved runs, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArchive {
    runs: Vec<Run>,
}

impl RunArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Loads the archive from storage. Missing, unreadable or corrupt data gives an empty archive.
    pub async fn load_all(store: &dyn KeyValueStore) -> Self {
        let payload = match store.get(RUNS_KEY).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::debug!("No saved runs found");
                return Self::new();
            }
            Err(err) => {
                tracing::error!("Failed to read saved runs, starting empty: {err}");
                return Self::new();
            }
        };

        match decode_runs(&payload) {
            Ok(runs) => {
                tracing::info!("Loaded {} saved runs", runs.len());
                Self::from_runs(runs)
            }
            Err(err) => {
                tracing::warn!("Ignoring saved runs: {err}");
                Self::new()
            }
        }
    }

    pub async fn persist_all(&self, store: &dyn KeyValueStore) -> Result<(), ArchiveError> {
        let payload = encode_runs(&self.runs)?;
        store.set(RUNS_KEY, &payload).await?;
        tracing::debug!("Persisted {} runs", self.runs.len());
        Ok(())
    }

    pub fn append(&mut self, run: Run) -> &Run {
        tracing::info!("Archiving run {} ({:.3} km, {} s)", run.id, run.distance_km, run.duration_seconds);
        self.runs.push(run);
        &self.runs[self.runs.len() - 1]
    }

    /// Most recent first, at most `limit` runs.
    pub fn list_recent(&self, limit: usize) -> Vec<&Run> {
        self.runs.iter().rev().take(limit).collect()
    }

    pub fn get(&self, id: i64) -> Option<&Run> {
        self.runs.iter().find(|run| run.id == id)
    }

    /// Epoch milliseconds of `saved_at`, bumped past every id already in use.
    pub fn next_run_id(&self, saved_at: DateTime<Utc>) -> i64 {
        let candidate = saved_at.timestamp_millis();
        match self.runs.iter().map(|run| run.id).max() {
            Some(max_id) if max_id >= candidate => max_id + 1,
            _ => candidate,
        }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

pub fn encode_runs(runs: &[Run]) -> Result<String, ArchiveError> {
    serde_json::to_string(runs).map_err(ArchiveError::Serialize)
}

pub fn decode_runs(payload: &str) -> Result<Vec<Run>, ArchiveError> {
    serde_json::from_str(payload).map_err(ArchiveError::Corrupt)
}
