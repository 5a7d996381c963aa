//! The live tracking session.
//!
//! Distance is accumulated one sample at a time and never recomputed. Every
//! tracking attempt gets its own [`Generation`]; ticks and samples carrying any
//! other generation are ignored, so callbacks from a cancelled subscription
//! cannot reach a restarted session.
//!
//! Samples are not filtered. GPS jitter while standing still adds distance.

use chrono::{DateTime, Utc};
use run_tracker_data_management::RunArchive;
use run_tracker_lib::{
    geo::{distance_km, estimate_calories_at, pace_or_speed, DisplayMode},
    position::Position,
    run::Run,
    status::{GeoErrorKind, TrackerStatus},
};

use crate::{presentation::Metrics, TrackerError};

/// Runs at or below this distance are not worth saving (10 m).
pub const MIN_SAVE_DISTANCE_KM: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Tracking,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Session {
    status: SessionStatus,
    start_epoch_ms: Option<i64>,
    elapsed_seconds: u64,
    positions: Vec<Position>,
    total_distance_km: f64,

    generation: Generation,
    awaiting_fix: bool,
    last_error: Option<GeoErrorKind>,
    min_save_distance_km: f64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_min_save_distance(MIN_SAVE_DISTANCE_KM)
    }

    pub fn with_min_save_distance(min_save_distance_km: f64) -> Self {
        Self {
            status: SessionStatus::Idle,
            start_epoch_ms: None,
            elapsed_seconds: 0,
            positions: Vec::new(),
            total_distance_km: 0.,
            generation: Generation::default(),
            awaiting_fix: false,
            last_error: None,
            min_save_distance_km,
        }
    }

    /// Starts or resumes tracking. Returns the generation the timer and the
    /// position subscription must be tagged with, or `None` if already tracking.
    pub fn start(&mut self, now_ms: i64) -> Option<Generation> {
        if self.status == SessionStatus::Tracking {
            return None;
        }

        // Shift the start back so elapsed time continues from where it stopped
        self.start_epoch_ms = Some(now_ms - self.elapsed_seconds as i64 * 1000);
        self.status = SessionStatus::Tracking;
        self.generation = self.generation.next();
        self.awaiting_fix = true;
        self.last_error = None;

        Some(self.generation)
    }

    pub fn tick(&mut self, generation: Generation, now_ms: i64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.refresh_elapsed(now_ms);
        true
    }

    pub fn on_position_sample(&mut self, generation: Generation, position: Position) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        if let Some(last) = self.positions.last() {
            self.total_distance_km += distance_km(last.point(), position.point());
        }
        self.positions.push(position);
        self.awaiting_fix = false;

        true
    }

    pub fn stop(&mut self, now_ms: i64) -> bool {
        if self.status != SessionStatus::Tracking {
            return false;
        }
        self.refresh_elapsed(now_ms);
        self.halt();
        true
    }

    /// The position stream gave up on the current attempt.
    pub fn fail(&mut self, generation: Generation, kind: GeoErrorKind, now_ms: i64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.stop(now_ms);
        self.last_error = Some(kind);
        true
    }

    pub fn reset(&mut self) {
        if self.status == SessionStatus::Tracking {
            self.halt();
        }

        self.status = SessionStatus::Idle;
        self.start_epoch_ms = None;
        self.elapsed_seconds = 0;
        self.positions.clear();
        self.total_distance_km = 0.;
        self.last_error = None;
        self.generation = self.generation.next();
    }

    /// Archives a snapshot of the session. The session itself is left untouched.
    pub fn save<'a>(&self, archive: &'a mut RunArchive, saved_at: DateTime<Utc>) -> Result<&'a Run, TrackerError> {
        // Written so a NaN distance is also too short
        if !(self.total_distance_km > self.min_save_distance_km) {
            return Err(TrackerError::RunTooShort { distance_km: self.total_distance_km });
        }

        let run = Run::new(
            archive.next_run_id(saved_at),
            saved_at,
            self.total_distance_km,
            self.elapsed_seconds,
            self.positions.clone(),
        );

        Ok(archive.append(run))
    }

    pub fn status(&self) -> TrackerStatus {
        match self.status {
            SessionStatus::Idle => TrackerStatus::Idle,
            SessionStatus::Tracking if self.awaiting_fix => TrackerStatus::AcquiringSignal,
            SessionStatus::Tracking => TrackerStatus::Tracking,
            SessionStatus::Stopped => match self.last_error {
                Some(kind) => TrackerStatus::Error(kind),
                None => TrackerStatus::Paused,
            },
        }
    }

    pub fn metrics(&self, display: DisplayMode, calories_per_km: f64) -> Metrics {
        Metrics {
            total_distance_km: self.total_distance_km,
            elapsed_seconds: self.elapsed_seconds,
            pace_or_speed: pace_or_speed(display, self.total_distance_km, self.elapsed_seconds),
            calories: estimate_calories_at(self.total_distance_km, calories_per_km),
            status: self.status(),
        }
    }

    pub fn session_status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_tracking(&self) -> bool {
        self.status == SessionStatus::Tracking
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn start_epoch_ms(&self) -> Option<i64> {
        self.start_epoch_ms
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn last_error(&self) -> Option<GeoErrorKind> {
        self.last_error
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.status == SessionStatus::Tracking && self.generation == generation
    }

    fn halt(&mut self) {
        self.status = SessionStatus::Stopped;
        self.awaiting_fix = false;
        self.generation = self.generation.next();
    }

    fn refresh_elapsed(&mut self, now_ms: i64) {
        let Some(start) = self.start_epoch_ms else {
            return;
        };
        // A clock stepping backwards must not make the timer run backwards
        let elapsed = ((now_ms - start).max(0) / 1000) as u64;
        self.elapsed_seconds = self.elapsed_seconds.max(elapsed);
    }
}
