/// Directory traversal shared by the synchronous walker and the emitters.
///
/// Two traversals produce the same sorted pre-order:
/// - [`Traversal::Parallel`] uses `jwalk` with a rayon pool. Prune decisions
///   are made inside `process_read_dir`, on the worker that read the parent
///   directory, so pruned subtrees are never opened. Workers read ahead of
///   the consumer, so this is only used when the whole tree is wanted.
/// - [`Traversal::OnDemand`] uses `walkdir`, which lists a directory only
///   when the iterator reaches it. A consumer that stops pulling stops the
///   disk reads too.
use crate::cancel::CancelToken;
use crate::error::{Result, ScanError};
use crate::model::ScanRequest;
use crate::policy::ScanPolicy;
use std::ffi::OsStr;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Qualifying directories; `None` marks an entry that was skipped and logged.
type Entries = Box<dyn Iterator<Item = Option<PathBuf>>>;

/// How the tree is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Traversal {
    Parallel,
    OnDemand,
}

/// A live pre-order walk yielding every directory that survives the policy.
///
/// The cancellation token is checked before each entry is processed; once it
/// is raised the walk yields a single `Err(ScanError::Cancelled)` and ends.
pub(crate) struct DirWalk {
    entries: Entries,
    cancel: CancelToken,
    halted: bool,
}

impl DirWalk {
    /// Start walking `policy.root()`.
    ///
    /// Fails with [`ScanError::RootUnreachable`] if the root cannot be
    /// statted or, for a directory, cannot be listed. A root that is a plain
    /// file yields an empty walk.
    pub(crate) fn open(
        policy: ScanPolicy,
        traversal: Traversal,
        cancel: CancelToken,
    ) -> Result<Self> {
        let root = policy.root().to_path_buf();
        let unreachable = |source| ScanError::RootUnreachable {
            path: root.clone(),
            source,
        };

        let meta = fs::metadata(&root).map_err(unreachable)?;
        if !meta.is_dir() {
            debug!("Scan root {} is not a directory", root.display());
            return Ok(Self {
                entries: Box::new(std::iter::empty()),
                cancel,
                halted: false,
            });
        }
        // Both walkers report a failing root listing as an ordinary entry
        // error, which would be swallowed. Check it here so it surfaces.
        fs::read_dir(&root).map_err(unreachable)?;

        let entries = match traversal {
            Traversal::Parallel => parallel(&root, policy, cancel.clone()),
            Traversal::OnDemand => on_demand(&root, policy),
        };
        Ok(Self {
            entries,
            cancel,
            halted: false,
        })
    }
}

fn parallel(root: &Path, policy: ScanPolicy, cancel: CancelToken) -> Entries {
    let policy = Arc::new(policy);
    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
        .process_read_dir(move |_depth, _dir, _state, children| {
            if cancel.is_cancelled() {
                children.retain(|child| matches!(child, Ok(entry) if entry.depth == 0));
                return;
            }
            children.retain(|child| match child {
                // Kept so the consumer can log it.
                Err(_) => true,
                Ok(entry) if entry.depth == 0 => true,
                Ok(entry) => {
                    entry.file_type().is_dir()
                        && admits(&policy, &entry.path(), entry.file_name())
                }
            });
        });

    Box::new(walker.into_iter().map(|found| match found {
        // The root is the starting point, not a result.
        Ok(entry) if entry.depth > 0 && entry.file_type().is_dir() => Some(entry.path()),
        Ok(_) => None,
        Err(err) => {
            skipped(err.path(), &err);
            None
        }
    }))
}

fn on_demand(root: &Path, policy: ScanPolicy) -> Entries {
    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry.file_type().is_dir() && admits(&policy, entry.path(), entry.file_name())
        });

    Box::new(walker.map(|found| match found {
        Ok(entry) => Some(entry.into_path()),
        Err(err) => {
            skipped(err.path(), &err);
            None
        }
    }))
}

fn admits(policy: &ScanPolicy, path: &Path, name: &OsStr) -> bool {
    match policy.prune(path, name) {
        Some(reason) => {
            trace!("Pruned {} ({reason:?})", path.display());
            false
        }
        None => true,
    }
}

fn skipped(path: Option<&Path>, err: &dyn Display) {
    let path = path.map(|p| p.display().to_string()).unwrap_or_default();
    debug!("Skipping unreadable entry {path}: {err}");
}

impl Iterator for DirWalk {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        loop {
            if self.cancel.is_cancelled() {
                self.halted = true;
                return Some(Err(ScanError::Cancelled));
            }
            if let Some(dir) = self.entries.next()? {
                return Some(Ok(dir));
            }
        }
    }
}

/// Walk `request.root` to completion and return every qualifying directory
/// in pre-order.
///
/// Blocking. Only a failure to open the root is reported; unreadable entries
/// below it are skipped.
pub fn scan(request: &ScanRequest) -> Result<Vec<PathBuf>> {
    let start = Instant::now();
    let walk = DirWalk::open(request.policy(), Traversal::Parallel, CancelToken::new())?;
    let directories = walk.collect::<Result<Vec<_>>>()?;
    info!(
        "Walked {} in {:?}: {} directories",
        request.root.display(),
        start.elapsed(),
        directories.len()
    );
    Ok(directories)
}

/// [`scan`] with default batch settings, for callers that only care about
/// depth and ignore behaviour.
pub fn scan_directories(
    root: impl Into<PathBuf>,
    max_depth: usize,
    use_ignore_patterns: bool,
) -> Result<Vec<PathBuf>> {
    let request = ScanRequest::new(root)
        .with_max_depth(max_depth)
        .with_ignore_patterns(use_ignore_patterns);
    scan(&request)
}
