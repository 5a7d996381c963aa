use std::{sync::Arc, time::Duration};

use run_tracker_data_management::{ArchiveWriter, KeyValueStore, RunArchive};
use run_tracker_lib::status::TrackerStatus;
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    clock::Clock,
    config::TrackerConfig,
    position_stream::{PositionSource, StreamSender, SubscriptionHandle, TrackerEvent},
    presentation::{Metrics, PresentationSink},
    session::{Generation, Session},
    TrackerError,
};

/// Owns the live session and wires it to the timer, the position source,
/// the run archive and the presentation sink.
///
/// All session changes happen on the task calling into the tracker. The timer
/// and the position source only queue events.
pub struct Tracker {
    session: Session,
    archive: RunArchive,
    writer: Option<ArchiveWriter>,
    source: Box<dyn PositionSource>,
    sink: Box<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,

    tx: mpsc::UnboundedSender<TrackerEvent>,
    rx: mpsc::UnboundedReceiver<TrackerEvent>,
    subscription: Option<SubscriptionHandle>,
    ticker: Option<JoinHandle<()>>,
    shown_status: Option<TrackerStatus>,
}

impl Tracker {
    pub async fn open(
        config: TrackerConfig,
        store: Arc<dyn KeyValueStore>,
        source: Box<dyn PositionSource>,
        sink: Box<dyn PresentationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let archive = RunArchive::load_all(store.as_ref()).await;
        let writer = Some(ArchiveWriter::spawn(store));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut tracker = Self {
            session: Session::with_min_save_distance(config.min_save_distance_km),
            archive,
            writer,
            source,
            sink,
            clock,
            config,
            tx,
            rx,
            subscription: None,
            ticker: None,
            shown_status: None,
        };

        tracker.publish_runs();
        tracker.publish();
        tracker
    }

    /// Starts or resumes tracking. Returns false if already tracking.
    pub fn start(&mut self) -> bool {
        let Some(generation) = self.session.start(self.clock.now_ms()) else {
            tracing::debug!("Start ignored, already tracking");
            return false;
        };

        tracing::info!("Tracking started");
        self.ticker = Some(spawn_ticker(generation, self.config.tick_interval, self.tx.clone()));
        let resume_after = self.session.positions().last().map(|position| position.timestamp);
        let sender = StreamSender::new(generation, self.tx.clone()).resuming_after(resume_after);
        self.subscription = Some(self.source.subscribe(sender));

        self.publish();
        true
    }

    /// Returns false if not tracking.
    pub fn stop(&mut self) -> bool {
        if !self.session.stop(self.clock.now_ms()) {
            return false;
        }

        tracing::info!("Tracking stopped after {} s", self.session.elapsed_seconds());
        self.cancel_subscription();
        self.publish();
        true
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.cancel_subscription();
        tracing::info!("Session reset");
        self.publish();
    }

    /// Archives the current session and returns the new run id. The session is not reset.
    pub fn save(&mut self) -> Result<i64, TrackerError> {
        let now = self.clock.now();
        self.session.tick(self.session.generation(), now.timestamp_millis());

        let run_id = match self.session.save(&mut self.archive, now) {
            Ok(run) => run.id,
            Err(err) => {
                tracing::info!("Not saving: {err}");
                self.sink.notice(&err);
                return Err(err);
            }
        };

        self.persist();
        self.publish_runs();
        self.publish();

        Ok(run_id)
    }

    pub fn handle_event(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::Tick { generation } => {
                if self.session.tick(generation, self.clock.now_ms()) {
                    self.publish();
                }
            }
            TrackerEvent::Sample { generation, position } => {
                if self.session.on_position_sample(generation, position) {
                    self.sink.path_point(&position);
                    self.publish();
                } else {
                    tracing::trace!("Dropped sample from stale subscription");
                }
            }
            TrackerEvent::StreamError { generation, kind } => {
                if self.session.fail(generation, kind, self.clock.now_ms()) {
                    tracing::warn!("Position stream failed: {kind}");
                    self.cancel_subscription();
                    self.sink.notice(&TrackerError::Geo(kind));
                    self.publish();
                } else {
                    tracing::debug!("Ignored stale stream error: {kind}");
                }
            }
        }
    }

    /// Waits for and handles one event.
    pub async fn process_next_event(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Handles every event already queued, without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub async fn run(&mut self) {
        while self.process_next_event().await {}
    }

    /// Stops tracking and writes the archive before returning.
    pub async fn shutdown(mut self) {
        self.stop();
        self.persist();
        if let Some(writer) = self.writer.take() {
            writer.close().await;
        }
        tracing::info!("Tracker shut down with {} saved runs", self.archive.len());
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn archive(&self) -> &RunArchive {
        &self.archive
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn status(&self) -> TrackerStatus {
        self.session.status()
    }

    pub fn metrics(&self) -> Metrics {
        self.session.metrics(self.config.display, self.config.calories_per_km)
    }

    fn persist(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        if let Err(err) = writer.submit(&self.archive) {
            tracing::error!("Failed to queue archive for persisting: {err}");
        }
    }

    fn cancel_subscription(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(handle) = self.subscription.take() {
            self.source.unsubscribe(handle);
        }
    }

    fn publish(&mut self) {
        let metrics = self.metrics();
        if self.shown_status != Some(metrics.status) {
            self.shown_status = Some(metrics.status);
            self.sink.status(metrics.status);
        }
        self.sink.metrics(&metrics);
    }

    fn publish_runs(&mut self) {
        let recent = self.archive.list_recent(self.config.recent_runs_limit);
        self.sink.runs_changed(&recent);
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.cancel_subscription();
    }
}

fn spawn_ticker(generation: Generation, period: Duration, tx: mpsc::UnboundedSender<TrackerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            if tx.send(TrackerEvent::Tick { generation }).is_err() {
                break;
            }
        }
    })
}
