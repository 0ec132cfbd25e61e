//! Depth, ignore and exclusion rules.
//!
//! Every rule here is a prune: a rejected directory is dropped together with
//! its whole subtree, never just skipped as a single entry.
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Directory names skipped by default: version control, dependency caches and
/// build output.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    ".cache",
    "vendor",
    "__pycache__",
    ".pytest_cache",
    "dist",
    "build",
    ".terraform",
    ".vscode",
    ".idea",
];

/// An immutable set of directory basenames to prune.
///
/// Cloning is a refcount bump, so one set can be shared by every scan and
/// every walker thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnoreSet {
    names: Arc<HashSet<String>>,
}

impl IgnoreSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Arc::new(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Exact, case-sensitive match against a directory's own name.
    ///
    /// Names that are not valid UTF-8 never match.
    pub fn should_ignore(&self, name: impl AsRef<OsStr>) -> bool {
        name.as_ref()
            .to_str()
            .is_some_and(|name| self.names.contains(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::from_names(DEFAULT_IGNORE_PATTERNS.iter().copied())
    }
}

/// Nesting depth of `path` below `root`: the number of separators in the
/// relative path. Direct children are at depth 0, and so is `root` itself.
///
/// Returns `None` when `path` is not under `root`.
pub fn depth_below(path: &Path, root: &Path) -> Option<usize> {
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.components().count().saturating_sub(1))
}

/// `true` iff `path` lies under `root` no deeper than `max_depth`.
///
/// The bound is inclusive. A path outside `root` is never within depth.
pub fn is_within_depth(path: &Path, root: &Path, max_depth: usize) -> bool {
    depth_below(path, root).is_some_and(|depth| depth <= max_depth)
}

/// `true` iff `path` is `exclude` or one of its descendants.
///
/// Compares whole components, so `/a/bc` is not under `/a/b`.
pub fn is_excluded(path: &Path, exclude: &Path) -> bool {
    path.starts_with(exclude)
}

/// Remove `.` components and resolve `..` against the preceding component,
/// without touching the filesystem.
///
/// Exclusion compares components, so a root spelled `/x/a/../proj` would not
/// exclude `/x/proj`. `..` directly below the root stays at the root; a
/// leading `..` in a relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match clean.components().next_back() {
                Some(Component::Normal(_)) => {
                    clean.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => clean.push(".."),
            },
            other => clean.push(other),
        }
    }
    if clean.as_os_str().is_empty() {
        clean.push(".");
    }
    clean
}

/// Why a directory was pruned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prune {
    Excluded,
    TooDeep,
    Ignored,
}

/// The complete set of prune rules for one traversal.
#[derive(Clone, Debug)]
pub struct ScanPolicy {
    root: PathBuf,
    max_depth: usize,
    /// `None` when ignore patterns are disabled.
    ignore: Option<IgnoreSet>,
    exclude: Option<PathBuf>,
}

impl ScanPolicy {
    pub fn new(root: PathBuf, max_depth: usize, ignore: Option<IgnoreSet>) -> Self {
        Self {
            root,
            max_depth,
            ignore,
            exclude: None,
        }
    }

    /// Additionally prune `exclude` and everything below it.
    pub fn excluding(mut self, exclude: PathBuf) -> Self {
        self.exclude = Some(exclude);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decide whether the directory at `path` (named `name`) is pruned.
    ///
    /// The exclusion check runs first and does not depend on the ignore
    /// setting.
    pub fn prune(&self, path: &Path, name: &OsStr) -> Option<Prune> {
        if let Some(exclude) = &self.exclude {
            if is_excluded(path, exclude) {
                return Some(Prune::Excluded);
            }
        }
        if !is_within_depth(path, &self.root, self.max_depth) {
            return Some(Prune::TooDeep);
        }
        match &self.ignore {
            Some(ignore) if ignore.should_ignore(name) => Some(Prune::Ignored),
            _ => None,
        }
    }
}
