use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};

use crate::{storage::KeyValueStore, ArchiveError, RUNS_KEY};

use super::run_archive::{encode_runs, RunArchive};

/// Background persister for the archive.
///
/// Submitting never waits on storage. Snapshots submitted while a write is in
/// flight are coalesced, and the latest one is always written last.
pub struct ArchiveWriter {
    tx: watch::Sender<Option<String>>,
    handle: JoinHandle<()>,
}

impl ArchiveWriter {
    pub fn spawn(store: Arc<dyn KeyValueStore>) -> Self {
        let (tx, mut rx) = watch::channel(None::<String>);

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(payload) = rx.borrow_and_update().clone() else {
                    continue;
                };

                if let Err(err) = store.set(RUNS_KEY, &payload).await {
                    tracing::error!("Failed to persist runs: {err}");
                }
            }
            tracing::debug!("Archive writer stopped");
        });

        Self { tx, handle }
    }

    pub fn submit(&self, archive: &RunArchive) -> Result<(), ArchiveError> {
        let payload = encode_runs(archive.runs())?;
        self.tx.send_replace(Some(payload));
        Ok(())
    }

    /// Writes whatever is still pending and waits for the writer to finish.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(err) = self.handle.await {
            tracing::error!("Archive writer task failed: {err}");
        }
    }
}
