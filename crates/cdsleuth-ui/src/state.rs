/// Session state shared between the scan relay and the input loop.
///
/// All mutable state lives in one `UiState` behind a `parking_lot::RwLock`.
/// The scan relay appends batches, the input loop applies keystrokes, and
/// the render step takes a [`Snapshot`] under the read lock. Nothing ever
/// hands out a reference into the locked state, and no lock is held across a
/// blocking call.
use crate::keys::{Key, KeyOutcome};
use crate::rank::{display_path, home_dir, Ranker, ScoredMatch};
use cdsleuth_core::{DirectoryBatch, ScanError};
use compact_str::CompactString;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows shown per page until the frontend reports its real height.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A row in the visible window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRow {
    pub path: PathBuf,
    /// `path` with the home directory shown as `~`.
    pub display: String,
    pub score: u32,
    /// Char positions in the lossy string form of `path` that matched.
    pub matched_indexes: Vec<usize>,
    pub selected: bool,
}

/// What the render step needs for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub query: String,
    pub selected_index: usize,
    pub scroll_offset: usize,
    /// Matches from `scroll_offset`, at most the requested number of rows.
    pub rows: Vec<SnapshotRow>,
    pub total_directories: usize,
    pub total_matches: usize,
    pub scan_complete: bool,
}

struct UiState {
    filter_query: CompactString,
    selected_index: usize,
    scroll_offset: usize,
    /// Append-only, in discovery order.
    all_directories: Vec<PathBuf>,
    /// Lossy string form of `all_directories`, what the ranker sees.
    labels: Vec<String>,
    current_matches: Vec<ScoredMatch>,
    scan_complete: bool,
    scan_error: Option<ScanError>,
    page_size: usize,
}

impl UiState {
    fn new() -> Self {
        Self {
            filter_query: CompactString::default(),
            selected_index: 0,
            scroll_offset: 0,
            all_directories: Vec::new(),
            labels: Vec::new(),
            current_matches: Vec::new(),
            scan_complete: false,
            scan_error: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    fn rerank(&mut self, ranker: &dyn Ranker) {
        self.current_matches = ranker.rank(&self.filter_query, &self.labels);
    }

    /// Keep the selection on a match and inside the scroll window.
    fn clamp_selection(&mut self) {
        let len = self.current_matches.len();
        if len == 0 {
            self.selected_index = 0;
            self.scroll_offset = 0;
            return;
        }
        self.selected_index = self.selected_index.min(len - 1);
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + self.page_size {
            self.scroll_offset = self.selected_index + 1 - self.page_size;
        }
    }

    fn reset_selection(&mut self) {
        self.selected_index = 0;
        self.scroll_offset = 0;
    }
}

/// Cheaply cloneable handle to the session state.
#[derive(Clone)]
pub struct SharedUiState {
    inner: Arc<RwLock<UiState>>,
    ranker: Arc<dyn Ranker>,
    home: Option<Arc<PathBuf>>,
}

impl SharedUiState {
    pub fn new(ranker: Arc<dyn Ranker>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(UiState::new())),
            ranker,
            home: home_dir().map(Arc::new),
        }
    }

    /// Use `home` instead of the environment when abbreviating paths.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home.map(Arc::new);
        self
    }

    /// Merge one batch from the scan.
    ///
    /// Appends the directories, re-ranks everything against the current
    /// query and records completion. The first error other than a
    /// cancellation is kept for [`take_scan_error`](Self::take_scan_error).
    pub fn apply_batch(&self, batch: DirectoryBatch) {
        let mut state = self.inner.write();
        if !batch.directories.is_empty() {
            state.labels.extend(
                batch
                    .directories
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            );
            state.all_directories.extend(batch.directories);
            state.rerank(self.ranker.as_ref());
            state.clamp_selection();
        }

        if batch.done {
            state.scan_complete = true;
            debug!(
                "Scan complete: {} directories",
                state.all_directories.len()
            );
        }
        if let Some(err) = batch.error {
            if err.is_cancelled() {
                debug!("Scan ended by cancellation");
            } else if state.scan_error.is_none() {
                warn!("Scan failed: {err}");
                state.scan_error = Some(err);
            }
        }
    }

    /// Apply one keystroke.
    pub fn handle_key(&self, key: Key) -> KeyOutcome {
        let mut state = self.inner.write();
        match key {
            Key::Char(c) => {
                state.filter_query.push(c);
                state.rerank(self.ranker.as_ref());
                state.reset_selection();
            }
            Key::Backspace => {
                if state.filter_query.pop().is_some() {
                    state.rerank(self.ranker.as_ref());
                }
                state.reset_selection();
            }
            Key::Up => {
                if state.selected_index > 0 {
                    state.selected_index -= 1;
                    state.clamp_selection();
                }
            }
            Key::Down => {
                if state.selected_index + 1 < state.current_matches.len() {
                    state.selected_index += 1;
                    state.clamp_selection();
                }
            }
            Key::Enter => {
                return match state.current_matches.get(state.selected_index) {
                    Some(m) => KeyOutcome::Confirmed(state.all_directories[m.index].clone()),
                    None => KeyOutcome::Cancelled,
                };
            }
            Key::Escape | Key::Quit => return KeyOutcome::Cancelled,
        }
        KeyOutcome::Continue
    }

    /// Set how many rows the frontend shows; the selection stays visible.
    pub fn set_page_size(&self, rows: usize) {
        let mut state = self.inner.write();
        state.page_size = rows.max(1);
        state.clamp_selection();
    }

    pub fn page_size(&self) -> usize {
        self.inner.read().page_size
    }

    /// Copy the visible window, at most `rows` matches starting at the
    /// scroll offset.
    pub fn snapshot(&self, rows: usize) -> Snapshot {
        let state = self.inner.read();
        let home = self.home.as_deref().map(|p| p.as_path());
        let rows = state
            .current_matches
            .iter()
            .enumerate()
            .skip(state.scroll_offset)
            .take(rows)
            .map(|(position, m)| {
                let path = state.all_directories[m.index].clone();
                SnapshotRow {
                    display: display_path(&path, home),
                    path,
                    score: m.score,
                    matched_indexes: m.matched_indexes.clone(),
                    selected: position == state.selected_index,
                }
            })
            .collect();

        Snapshot {
            query: state.filter_query.to_string(),
            selected_index: state.selected_index,
            scroll_offset: state.scroll_offset,
            rows,
            total_directories: state.all_directories.len(),
            total_matches: state.current_matches.len(),
            scan_complete: state.scan_complete,
        }
    }

    /// Take the pending scan error, if any. Each error is returned once.
    pub fn take_scan_error(&self) -> Option<ScanError> {
        self.inner.write().scan_error.take()
    }

    pub fn directory_count(&self) -> usize {
        self.inner.read().all_directories.len()
    }

    pub fn is_scan_complete(&self) -> bool {
        self.inner.read().scan_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::SubsequenceRanker;

    fn state() -> SharedUiState {
        SharedUiState::new(Arc::new(SubsequenceRanker::new())).with_home(None)
    }

    fn batch(paths: &[&str], done: bool) -> DirectoryBatch {
        let dirs = paths.iter().map(PathBuf::from).collect();
        if done {
            DirectoryBatch::finished(dirs, None)
        } else {
            DirectoryBatch::progress(dirs)
        }
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("/d/{i:02}")).collect()
    }

    fn apply_numbered(state: &SharedUiState, n: usize) {
        let paths = numbered(n);
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        state.apply_batch(batch(&refs, false));
    }

    /// Counts calls and ranks nothing.
    #[derive(Default)]
    struct CountingRanker {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Ranker for CountingRanker {
        fn rank(&self, _query: &str, _candidates: &[String]) -> Vec<ScoredMatch> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            Vec::new()
        }
    }

    #[test]
    fn empty_batches_do_not_rerank() {
        let ranker = Arc::new(CountingRanker::default());
        let s = SharedUiState::new(ranker.clone()).with_home(None);
        let calls = || ranker.calls.load(std::sync::atomic::Ordering::Relaxed);

        s.apply_batch(batch(&["/a"], false));
        assert_eq!(calls(), 1);
        s.apply_batch(batch(&[], false));
        s.apply_batch(batch(&[], true));
        assert_eq!(calls(), 1);
        assert!(s.is_scan_complete());
        assert_eq!(s.directory_count(), 1);
    }

    #[test]
    fn batches_accumulate_in_discovery_order() {
        let s = state();
        s.apply_batch(batch(&["/a", "/b"], false));
        s.apply_batch(batch(&["/c"], true));

        let snap = s.snapshot(10);
        assert_eq!(snap.total_directories, 3);
        assert!(snap.scan_complete);
        let paths: Vec<_> = snap.rows.iter().map(|r| r.display.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn typing_filters_and_resets_selection() {
        let s = state();
        s.apply_batch(batch(&["/src", "/docs", "/srv"], false));
        s.handle_key(Key::Down);
        assert_eq!(s.snapshot(10).selected_index, 1);

        assert_eq!(s.handle_key(Key::Char('d')), KeyOutcome::Continue);
        let snap = s.snapshot(10);
        assert_eq!(snap.query, "d");
        assert_eq!(snap.selected_index, 0);
        assert_eq!(snap.total_matches, 1);
        assert_eq!(snap.rows[0].path, PathBuf::from("/docs"));

        s.handle_key(Key::Backspace);
        assert_eq!(s.snapshot(10).total_matches, 3);
    }

    #[test]
    fn backspace_on_empty_query_is_harmless() {
        let s = state();
        s.apply_batch(batch(&["/a"], false));
        assert_eq!(s.handle_key(Key::Backspace), KeyOutcome::Continue);
        assert_eq!(s.snapshot(5).query, "");
    }

    #[test]
    fn up_and_down_stay_in_bounds() {
        let s = state();
        s.apply_batch(batch(&["/a", "/b"], false));
        s.handle_key(Key::Up);
        assert_eq!(s.snapshot(5).selected_index, 0);
        s.handle_key(Key::Down);
        s.handle_key(Key::Down);
        s.handle_key(Key::Down);
        assert_eq!(s.snapshot(5).selected_index, 1);
    }

    #[test]
    fn scrolling_follows_selection() {
        let s = state();
        s.set_page_size(3);
        apply_numbered(&s, 10);

        for _ in 0..4 {
            s.handle_key(Key::Down);
        }
        let snap = s.snapshot(3);
        assert_eq!(snap.selected_index, 4);
        assert_eq!(snap.scroll_offset, 2);
        assert_eq!(snap.rows.len(), 3);
        assert!(snap.rows[2].selected);

        for _ in 0..3 {
            s.handle_key(Key::Up);
        }
        let snap = s.snapshot(3);
        assert_eq!(snap.selected_index, 1);
        assert_eq!(snap.scroll_offset, 1);
    }

    #[test]
    fn shrinking_page_keeps_selection_visible() {
        let s = state();
        apply_numbered(&s, 30);
        for _ in 0..15 {
            s.handle_key(Key::Down);
        }
        s.set_page_size(5);
        let snap = s.snapshot(5);
        assert!(snap.scroll_offset <= 15 && 15 < snap.scroll_offset + 5);
    }

    #[test]
    fn enter_confirms_selected_match() {
        let s = state();
        s.apply_batch(batch(&["/a", "/b"], false));
        s.handle_key(Key::Down);
        assert_eq!(
            s.handle_key(Key::Enter),
            KeyOutcome::Confirmed(PathBuf::from("/b"))
        );
    }

    #[test]
    fn enter_without_matches_cancels() {
        let s = state();
        assert_eq!(s.handle_key(Key::Enter), KeyOutcome::Cancelled);
        s.apply_batch(batch(&["/a"], false));
        s.handle_key(Key::Char('z'));
        assert_eq!(s.handle_key(Key::Enter), KeyOutcome::Cancelled);
    }

    #[test]
    fn escape_and_quit_cancel() {
        let s = state();
        assert_eq!(s.handle_key(Key::Escape), KeyOutcome::Cancelled);
        assert_eq!(s.handle_key(Key::Quit), KeyOutcome::Cancelled);
    }

    #[test]
    fn first_real_error_is_kept_once() {
        let s = state();
        s.apply_batch(DirectoryBatch::finished(Vec::new(), Some(ScanError::ProducerLost)));
        s.apply_batch(DirectoryBatch::finished(Vec::new(), Some(ScanError::Cancelled)));
        assert!(matches!(s.take_scan_error(), Some(ScanError::ProducerLost)));
        assert!(s.take_scan_error().is_none());
    }

    #[test]
    fn cancellation_is_not_an_error() {
        let s = state();
        s.apply_batch(DirectoryBatch::finished(Vec::new(), Some(ScanError::Cancelled)));
        assert!(s.take_scan_error().is_none());
        assert!(s.is_scan_complete());
    }

    #[test]
    fn new_batches_clamp_selection() {
        let s = state();
        s.apply_batch(batch(&["/alpha", "/beta", "/gamma"], false));
        s.handle_key(Key::Down);
        s.handle_key(Key::Down);
        s.handle_key(Key::Char('a'));
        s.handle_key(Key::Char('l'));
        s.apply_batch(batch(&["/also"], false));
        let snap = s.snapshot(10);
        assert!(snap.selected_index < snap.total_matches);
    }

    #[test]
    fn home_is_abbreviated_in_rows() {
        let s = SharedUiState::new(Arc::new(SubsequenceRanker::new()))
            .with_home(Some(PathBuf::from("/home/me")));
        s.apply_batch(batch(&["/home/me/src"], false));
        let row = &s.snapshot(1).rows[0];
        assert_eq!(row.path, PathBuf::from("/home/me/src"));
        assert!(row.display.starts_with('~'));
    }
}
