//! Append-only writer for the progress event log.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

use cf_utils::atomic_write::append_line;

use crate::event::ProgressEvent;

/// Handle for appending well-formed events to one run's
/// `pipeline_events.jsonl`. Multiple writers (the module itself, and this
/// workspace's in-process crash watchdog) may append concurrently; each
/// `append` call is a single independent write.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    path: Utf8PathBuf,
}

impl ProgressSink {
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Append one event. Malformed events (missing run/stage ids) are
    /// rejected rather than written.
    pub fn append(&self, event: &ProgressEvent) -> io::Result<()> {
        if !event.is_well_formed() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "malformed progress event: missing run_id or stage",
            ));
        }
        let line = serde_json::to_string(event)?;
        append_line(&self.path, &line)
    }

    /// Read and parse every well-formed event currently on disk, in file
    /// order. A trailing partial line (crash mid-append) is silently
    /// skipped.
    pub fn read_all(&self) -> io::Result<Vec<ProgressEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str::<ProgressEvent>(line).ok())
            .collect())
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
