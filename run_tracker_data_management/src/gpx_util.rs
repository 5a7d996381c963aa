use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Time, Track, TrackSegment, Waypoint};
use run_tracker_lib::{geo::path_distance_km, position::Position, run::Run};
use time::OffsetDateTime;

use crate::{ArchiveError, RunArchive};

impl RunArchive {
    /// Appends every timed point of a GPX file as one run.
    pub fn import_gpx<R: Read>(&mut self, reader: R, saved_at: DateTime<Utc>) -> Result<&Run, ArchiveError> {
        let positions = read_gpx(reader)?;

        let duration_seconds = match (positions.first(), positions.last()) {
            (Some(first), Some(last)) => ((last.timestamp - first.timestamp).max(0) / 1000) as u64,
            _ => 0,
        };

        let run = Run::new(
            self.next_run_id(saved_at),
            saved_at,
            path_distance_km(&positions),
            duration_seconds,
            positions,
        );

        Ok(self.append(run))
    }
}

pub fn read_gpx<R: Read>(reader: R) -> Result<Vec<Position>, ArchiveError> {
    let gpx = gpx::read(reader).map_err(|err| ArchiveError::Gpx(format!("Failed to parse gpx: {err}")))?;

    let mut positions: Vec<Position> = Vec::new();
    let mut untimed = 0;
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = point.time.and_then(|time| time.format().ok())
                    .and_then(|time| DateTime::parse_from_rfc3339(&time).ok()) else {
                    untimed += 1;
                    continue;
                };

                positions.push(Position::from((point.point(), time.with_timezone(&Utc))));
            }
        }
    }

    if untimed > 0 {
        tracing::warn!("Skipped {} gpx points without a timestamp", untimed);
    }

    Ok(positions)
}

pub fn write_gpx<W: Write>(run: &Run, writer: W) -> Result<(), ArchiveError> {
    let mut segment = TrackSegment::new();
    for position in &run.positions {
        let mut waypoint = Waypoint::new(position.point());
        let time = OffsetDateTime::from_unix_timestamp_nanos(position.timestamp as i128 * 1_000_000)
            .map_err(|err| ArchiveError::Gpx(format!("Invalid timestamp {}: {err}", position.timestamp)))?;
        waypoint.time = Some(Time::from(time));
        segment.points.push(waypoint);
    }

    let mut track = Track::new();
    track.name = Some(format!("Run {}", run.saved_at.format("%Y-%m-%d %H:%M")));
    track.segments.push(segment);

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("run_tracker".to_string()),
        tracks: vec![track],
        ..Default::default()
    };

    gpx::write(&gpx, writer).map_err(|err| ArchiveError::Gpx(format!("Failed to write gpx: {err}")))
}
