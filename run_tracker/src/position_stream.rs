use std::{
    sync::{atomic::{AtomicUsize, Ordering}, Arc},
    time::Duration,
};

use run_tracker_lib::{position::Position, status::GeoErrorKind};
use tokio::{
    sync::{mpsc, Notify},
    task::JoinHandle,
};

use crate::{clock::ManualClock, session::Generation};

/// Everything that can wake the tracker. Each event carries the generation of
/// the tracking attempt that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Tick { generation: Generation },
    Sample { generation: Generation, position: Position },
    StreamError { generation: Generation, kind: GeoErrorKind },
}

/// The callbacks handed to a position source on subscribe.
#[derive(Debug, Clone)]
pub struct StreamSender {
    generation: Generation,
    resume_after: Option<i64>,
    tx: mpsc::UnboundedSender<TrackerEvent>,
}

impl StreamSender {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<TrackerEvent>) -> Self {
        Self { generation, resume_after: None, tx }
    }

    /// Timestamp of the last sample the session kept before this subscription.
    pub fn resuming_after(mut self, timestamp: Option<i64>) -> Self {
        self.resume_after = timestamp;
        self
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn resume_after(&self) -> Option<i64> {
        self.resume_after
    }

    /// Forwards a sample. Samples with impossible coordinates are dropped.
    /// Returns false once the tracker is gone.
    pub fn sample(&self, position: Position) -> bool {
        if !is_valid(&position) {
            tracing::warn!("Dropping invalid position {:?}", position);
            return !self.tx.is_closed();
        }
        self.tx.send(TrackerEvent::Sample { generation: self.generation, position }).is_ok()
    }

    pub fn error(&self, kind: GeoErrorKind) -> bool {
        self.tx.send(TrackerEvent::StreamError { generation: self.generation, kind }).is_ok()
    }
}

fn is_valid(position: &Position) -> bool {
    position.latitude.is_finite()
        && position.longitude.is_finite()
        && (-90.0..=90.0).contains(&position.latitude)
        && (-180.0..=180.0).contains(&position.longitude)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub id: u64,
    pub generation: Generation,
}

/// Where positions come from. Sources report through the [`StreamSender`]
/// and never retry on their own.
pub trait PositionSource {
    fn subscribe(&mut self, sender: StreamSender) -> SubscriptionHandle;

    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

/// Plays back recorded positions, e.g. from a gpx file.
///
/// Positions are paced by their timestamp deltas divided by `speedup`. A gap
/// longer than `timeout` ends the subscription with [`GeoErrorKind::Timeout`].
/// Subscribing again continues after the last position the session kept.
///
/// [`ReplaySource::clock`] follows the recorded timeline, so a tracker driven
/// by it measures recorded time instead of playback time.
pub struct ReplaySource {
    positions: Arc<Vec<Position>>,
    cursor: Arc<AtomicUsize>,
    clock: ManualClock,
    speedup: f64,
    timeout: Duration,
    done: Arc<Notify>,
    next_id: u64,
    active: Option<(SubscriptionHandle, JoinHandle<()>)>,
}

impl ReplaySource {
    pub fn new(positions: Vec<Position>, speedup: f64, timeout: Duration) -> Self {
        let speedup = if speedup.is_finite() && speedup > 0. { speedup } else { 1. };
        let clock = ManualClock::new(positions.first().map_or(0, |position| position.timestamp));
        Self {
            positions: Arc::new(positions),
            cursor: Arc::new(AtomicUsize::new(0)),
            clock,
            speedup,
            timeout,
            done: Arc::new(Notify::new()),
            next_id: 0,
            active: None,
        }
    }

    /// Notified when a replay runs out of positions or times out.
    pub fn done(&self) -> Arc<Notify> {
        self.done.clone()
    }

    /// Reads the timestamp of the last position played back.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn delivered(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    fn cancel(&mut self) {
        if let Some((handle, task)) = self.active.take() {
            tracing::debug!("Cancelling replay subscription {}", handle.id);
            task.abort();
        }
    }
}

impl PositionSource for ReplaySource {
    fn subscribe(&mut self, sender: StreamSender) -> SubscriptionHandle {
        self.cancel();

        // Positions queued but never consumed before the last stop are played again
        if let Some(timestamp) = sender.resume_after() {
            let resume = self.positions.partition_point(|position| position.timestamp <= timestamp);
            self.cursor.fetch_min(resume, Ordering::Relaxed);
        }

        self.next_id += 1;
        let handle = SubscriptionHandle { id: self.next_id, generation: sender.generation() };

        let task = tokio::spawn(replay(
            self.positions.clone(),
            self.cursor.clone(),
            self.clock.clone(),
            sender,
            self.speedup,
            self.timeout,
            self.done.clone(),
        ));
        self.active = Some((handle, task));

        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if self.active.as_ref().is_some_and(|(active, _)| *active == handle) {
            self.cancel();
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn replay(
    positions: Arc<Vec<Position>>,
    cursor: Arc<AtomicUsize>,
    clock: ManualClock,
    sender: StreamSender,
    speedup: f64,
    timeout: Duration,
    done: Arc<Notify>,
) {
    let mut previous: Option<i64> = None;

    loop {
        let index = cursor.load(Ordering::Relaxed);
        let Some(position) = positions.get(index).copied() else {
            break;
        };

        if let Some(previous) = previous {
            let gap_ms = (position.timestamp - previous).max(0) as f64 / speedup;
            match Duration::try_from_secs_f64(gap_ms / 1000.) {
                Ok(gap) if gap <= timeout => tokio::time::sleep(gap).await,
                _ => {
                    tokio::time::sleep(timeout).await;
                    tracing::warn!("Replay gap before position {} exceeds {:?}", index, timeout);
                    sender.error(GeoErrorKind::Timeout);
                    done.notify_one();
                    return;
                }
            }
        }

        clock.advance_to(position.timestamp);
        if !sender.sample(position) {
            return;
        }
        cursor.store(index + 1, Ordering::Relaxed);
        previous = Some(position.timestamp);
    }

    tracing::info!("Replay delivered all {} positions", positions.len());
    done.notify_one();
}

/// A platform without positioning: every subscription fails immediately.
#[derive(Debug, Default)]
pub struct UnsupportedSource {
    next_id: u64,
}

impl PositionSource for UnsupportedSource {
    fn subscribe(&mut self, sender: StreamSender) -> SubscriptionHandle {
        self.next_id += 1;
        sender.error(GeoErrorKind::Unsupported);
        SubscriptionHandle { id: self.next_id, generation: sender.generation() }
    }

    fn unsubscribe(&mut self, _handle: SubscriptionHandle) {}
}
