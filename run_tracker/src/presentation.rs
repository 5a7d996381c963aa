use run_tracker_lib::{
    geo::{format_duration, PaceOrSpeed},
    position::Position,
    run::Run,
    status::TrackerStatus,
};
use serde::Serialize;

use crate::TrackerError;

/// Everything the UI shows about the live session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_distance_km: f64,
    pub elapsed_seconds: u64,
    pub pace_or_speed: PaceOrSpeed,
    pub calories: u32,
    pub status: TrackerStatus,
}

/// Receives structured updates from the tracker. Implementations own all rendering.
pub trait PresentationSink {
    /// Called on every tick and accepted sample.
    fn metrics(&mut self, metrics: &Metrics);

    /// Called when the displayed status changes.
    fn status(&mut self, status: TrackerStatus);

    fn path_point(&mut self, position: &Position);

    /// Recent runs, most recent first.
    fn runs_changed(&mut self, runs: &[&Run]);

    /// User facing problems, like a run too short to save.
    fn notice(&mut self, error: &TrackerError);
}

/// Sends every update to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn metrics(&mut self, metrics: &Metrics) {
        tracing::debug!(
            "{:.2} km | {} | {} | {} kcal",
            metrics.total_distance_km,
            format_duration(metrics.elapsed_seconds),
            metrics.pace_or_speed,
            metrics.calories
        );
    }

    fn status(&mut self, status: TrackerStatus) {
        tracing::info!("{status}");
    }

    fn path_point(&mut self, position: &Position) {
        tracing::trace!("Path point {:.6}, {:.6}", position.latitude, position.longitude);
    }

    fn runs_changed(&mut self, runs: &[&Run]) {
        for run in runs {
            tracing::info!(
                "Run {}: {:.2} km in {}",
                run.saved_at.format("%d/%m/%Y %H:%M"),
                run.distance_km,
                format_duration(run.duration_seconds)
            );
        }
    }

    fn notice(&mut self, error: &TrackerError) {
        tracing::warn!("{error}");
    }
}
