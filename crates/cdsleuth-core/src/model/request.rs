//! Scan parameters.
use crate::policy::{IgnoreSet, ScanPolicy};
use std::path::PathBuf;

/// Default maximum nesting depth below the scan root.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Directories in the first batch of a stream.
///
/// Small enough that the first results show up almost immediately.
pub const DEFAULT_INITIAL_BATCH_SIZE: usize = 50;

/// Upper bound for adaptive batch growth.
///
/// Keeps each delivery cheap enough that the consumer never stalls on a
/// single oversized batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 200;

/// Everything a scan needs. Taken by value when a scan starts, so it cannot
/// change underneath a running traversal.
#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub max_depth: usize,
    pub use_ignore_patterns: bool,
    pub initial_batch_size: usize,
    pub max_batch_size: usize,
    pub ignore_set: IgnoreSet,
}

impl ScanRequest {
    /// A request with default depth, ignore and batch settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            use_ignore_patterns: true,
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            ignore_set: IgnoreSet::default(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_ignore_patterns(mut self, enabled: bool) -> Self {
        self.use_ignore_patterns = enabled;
        self
    }

    pub fn with_ignore_set(mut self, ignore_set: IgnoreSet) -> Self {
        self.ignore_set = ignore_set;
        self
    }

    /// Set both batch sizes. A zero initial size is raised to 1 and the
    /// maximum is never below the initial size.
    pub fn with_batch_sizes(mut self, initial: usize, max: usize) -> Self {
        self.initial_batch_size = initial.max(1);
        self.max_batch_size = max.max(self.initial_batch_size);
        self
    }

    /// The prune rules this request implies.
    pub fn policy(&self) -> ScanPolicy {
        let ignore = self
            .use_ignore_patterns
            .then(|| self.ignore_set.clone());
        ScanPolicy::new(self.root.clone(), self.max_depth, ignore)
    }
}
