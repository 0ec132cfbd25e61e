//! Error types for scanning and configuration.
//!
//! Only failures that matter to a caller surface here. Per-entry I/O errors
//! during traversal (permission denied, entries vanishing mid-walk) are logged
//! and absorbed by the walker and never reach these types.
use std::io;
use std::path::PathBuf;

/// A failure that ends a scan.
///
/// Streaming scans report it on the terminal [`DirectoryBatch`]; the
/// synchronous walker returns it directly.
///
/// [`DirectoryBatch`]: crate::model::DirectoryBatch
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The scan root itself could not be opened.
    #[error("cannot read scan root {}", path.display())]
    RootUnreachable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cancellation was requested before the scan finished.
    #[error("scan cancelled")]
    Cancelled,

    /// The producer thread could not be started.
    #[error("failed to start scanner thread")]
    Spawn(#[source] io::Error),

    /// The producer went away without reporting completion.
    #[error("scanner stopped without reporting completion")]
    ProducerLost,
}

impl ScanError {
    /// `true` for [`ScanError::Cancelled`], which consumers usually treat as
    /// "user cancelled" rather than as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Failure loading [`ScanSettings`](crate::config::ScanSettings).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScanError>;
