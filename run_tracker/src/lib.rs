use run_tracker_data_management::ArchiveError;
use run_tracker_lib::status::GeoErrorKind;

pub mod clock;
pub mod config;
pub mod position_stream;
pub mod presentation;
pub mod session;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use position_stream::{PositionSource, ReplaySource, StreamSender, SubscriptionHandle, TrackerEvent, UnsupportedSource};
pub use presentation::{LogSink, Metrics, PresentationSink};
pub use session::{Generation, Session, SessionStatus};
pub use tracker::Tracker;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("run is too short to save ({distance_km:.3} km)")]
    RunTooShort { distance_km: f64 },
    #[error(transparent)]
    Geo(#[from] GeoErrorKind),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
