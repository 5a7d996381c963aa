use serde::{Deserialize, Serialize};

/// Failures reported by a position source. None of them are retried by the source itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum GeoErrorKind {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
    #[error("timed out waiting for a location fix")]
    Timeout,
    #[error("location is not supported on this device")]
    Unsupported,
}

/// What the presentation layer should show about the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerStatus {
    Idle,
    /// Tracking, but no sample has arrived since the last start.
    AcquiringSignal,
    Tracking,
    Paused,
    Error(GeoErrorKind),
}

impl TrackerStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, TrackerStatus::Error(_))
    }
}

impl std::fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerStatus::Idle => write!(f, "Ready"),
            TrackerStatus::AcquiringSignal => write!(f, "Acquiring GPS signal..."),
            TrackerStatus::Tracking => write!(f, "Tracking"),
            TrackerStatus::Paused => write!(f, "Paused"),
            TrackerStatus::Error(kind) => write!(f, "Error: {kind}"),
        }
    }
}
