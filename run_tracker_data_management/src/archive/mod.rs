mod archive_writer;
mod run_archive;

pub use archive_writer::ArchiveWriter;
pub use run_archive::{decode_runs, encode_runs, RunArchive};
