use const_format::concatcp;

pub mod archive;
pub mod gpx_util;
pub mod storage;

pub use archive::{ArchiveWriter, RunArchive};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

pub const DATA_DIR: &str = "data/";

const KEY_NAMESPACE: &str = "run_tracker";
/// Storage key holding the serialized run list.
pub const RUNS_KEY: &str = concatcp!(KEY_NAMESPACE, ".runs");

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("archive payload is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize archive: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("gpx failure: {0}")]
    Gpx(String),
    #[error("no run with id {0}")]
    NotFound(i64),
}
