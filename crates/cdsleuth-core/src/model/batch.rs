//! One delivery from a streaming scan.
use crate::error::ScanError;
use std::path::PathBuf;

/// A batch of newly discovered directories.
///
/// Every stream ends with exactly one batch whose `done` flag is set, and
/// nothing follows it. Only that batch carries an `error`. A terminal batch
/// may hold no directories at all.
#[derive(Debug, Default)]
pub struct DirectoryBatch {
    /// Directories found since the previous batch, in traversal order.
    pub directories: Vec<PathBuf>,
    /// `true` on the last batch of the stream.
    pub done: bool,
    /// Why the scan ended early, if it did.
    pub error: Option<ScanError>,
}

impl DirectoryBatch {
    /// A non-final batch.
    pub fn progress(directories: Vec<PathBuf>) -> Self {
        Self {
            directories,
            done: false,
            error: None,
        }
    }

    /// The terminal batch.
    pub fn finished(directories: Vec<PathBuf>, error: Option<ScanError>) -> Self {
        Self {
            directories,
            done: true,
            error,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(ScanError::is_cancelled)
    }
}
