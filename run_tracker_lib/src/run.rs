use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Position;

/// An archived snapshot of a finished tracking session.
///
/// Runs own their positions outright, so nothing that happens to the live
/// session after saving can reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub saved_at: DateTime<Utc>,
    pub distance_km: f64,
    pub duration_seconds: u64,
    pub positions: Vec<Position>,
}

impl Run {
    pub fn new(id: i64, saved_at: DateTime<Utc>, distance_km: f64, duration_seconds: u64, positions: Vec<Position>) -> Self {
        Self {
            id,
            saved_at,
            distance_km,
            duration_seconds,
            positions,
        }
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.positions.first().and_then(|position| position.time())
    }
}
