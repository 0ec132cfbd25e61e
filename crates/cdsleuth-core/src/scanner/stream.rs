/// Batch emitter -- streams discovered directories in adaptively sized
/// batches instead of returning one final list.
///
/// # Batching
///
/// Early batches are small (`initial_batch_size`) so the consumer sees its
/// first results almost immediately. Once more than [`ADAPTIVE_GROWTH_AFTER`]
/// directories have been found the tree is known to be large, and every
/// further flush doubles the threshold up to `max_batch_size`, amortising the
/// per-delivery cost.
///
/// # Backpressure
///
/// Batches travel over a bounded channel of [`BATCH_CHANNEL_CAPACITY`]. A
/// producer that gets ahead of its consumer blocks on the send rather than
/// buffering, and the blocked send also waits on the cancellation token so a
/// cancelled scan can always exit.
use crate::cancel::{Blocked, CancelToken};
use crate::error::ScanError;
use crate::model::{DirectoryBatch, ScanRequest};
use crate::scanner::walk::{DirWalk, Traversal};
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Pending batches a consumer may fall behind by before the producer blocks.
pub const BATCH_CHANNEL_CAPACITY: usize = 2;

/// Directories found before the batch threshold starts doubling.
pub const ADAPTIVE_GROWTH_AFTER: usize = 500;

/// How long a cancelled producer waits for room for its terminal batch.
///
/// A consumer that has stopped reading is not waited on forever; the
/// [`BatchStream`] synthesizes the terminal batch instead.
const CANCELLED_FINAL_GRACE: Duration = Duration::from_millis(250);

/// Accumulation state threaded through one traversal.
#[derive(Debug)]
pub(crate) struct BatchState {
    buffer: Vec<PathBuf>,
    threshold: usize,
    max_threshold: usize,
    found: usize,
}

impl BatchState {
    pub(crate) fn new(initial: usize, max: usize) -> Self {
        let threshold = initial.max(1);
        Self {
            buffer: Vec::with_capacity(threshold),
            threshold,
            max_threshold: max.max(threshold),
            found: 0,
        }
    }

    /// Buffer a directory. Returns `true` when the buffer is due for a flush.
    pub(crate) fn push(&mut self, dir: PathBuf) -> bool {
        self.buffer.push(dir);
        self.found += 1;
        self.buffer.len() >= self.threshold
    }

    /// Copy of the buffered directories for delivery.
    ///
    /// The buffer is left untouched until [`BatchState::flushed`] confirms the
    /// copy was delivered.
    pub(crate) fn copy_out(&self) -> Vec<PathBuf> {
        self.buffer.clone()
    }

    /// Clear the buffer (keeping its allocation) and grow the threshold if
    /// the scan has become large.
    pub(crate) fn flushed(&mut self) {
        self.buffer.clear();
        if self.found > ADAPTIVE_GROWTH_AFTER && self.threshold < self.max_threshold {
            self.threshold = (self.threshold * 2).min(self.max_threshold);
        }
    }

    pub(crate) fn into_remaining(self) -> Vec<PathBuf> {
        self.buffer
    }

    pub(crate) fn found(&self) -> usize {
        self.found
    }

    #[cfg(test)]
    pub(crate) fn threshold(&self) -> usize {
        self.threshold
    }
}

/// Why an emitter stopped before the walk was exhausted.
enum Halt {
    Failed(ScanError),
    /// Nobody is listening any more; there is no one to report to.
    Disconnected,
}

impl From<ScanError> for Halt {
    fn from(err: ScanError) -> Self {
        Halt::Failed(err)
    }
}

/// Receiving end of a streaming scan.
///
/// Yields batches in traversal order and ends right after the terminal
/// (`done`) batch. If the producer disappears without sending one (it could
/// not be spawned, it panicked, or it gave up on a cancelled consumer) a
/// terminal batch is synthesized, so iteration always finishes with exactly
/// one `done` batch.
///
/// Dropping the stream disconnects the channel; the producer notices on its
/// next delivery and stops.
pub struct BatchStream {
    rx: Receiver<DirectoryBatch>,
    cancel: CancelToken,
    spawn_error: Option<io::Error>,
    finished: bool,
    _thread: Option<thread::JoinHandle<()>>,
}

impl BatchStream {
    pub(crate) fn new(
        rx: Receiver<DirectoryBatch>,
        cancel: CancelToken,
        thread: io::Result<thread::JoinHandle<()>>,
    ) -> Self {
        let (thread, spawn_error) = match thread {
            Ok(handle) => (Some(handle), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            rx,
            cancel,
            spawn_error,
            finished: false,
            _thread: thread,
        }
    }

    /// Request cancellation of the scan feeding this stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token this stream's producers observe.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Block until the next batch. `None` once the terminal batch has been
    /// returned.
    pub fn recv(&mut self) -> Option<DirectoryBatch> {
        if self.finished {
            return None;
        }
        let batch = match self.rx.recv() {
            Ok(batch) => batch,
            Err(_) => DirectoryBatch::finished(Vec::new(), Some(self.lost_producer_error())),
        };
        self.finished = batch.done;
        Some(batch)
    }

    fn lost_producer_error(&mut self) -> ScanError {
        if let Some(err) = self.spawn_error.take() {
            ScanError::Spawn(err)
        } else if self.cancel.is_cancelled() {
            ScanError::Cancelled
        } else {
            ScanError::ProducerLost
        }
    }
}

impl Iterator for BatchStream {
    type Item = DirectoryBatch;

    fn next(&mut self) -> Option<DirectoryBatch> {
        self.recv()
    }
}

/// Spawn a named producer thread feeding a fresh bounded channel.
pub(crate) fn spawn_producer<F>(name: &str, cancel: CancelToken, body: F) -> BatchStream
where
    F: FnOnce(Sender<DirectoryBatch>) + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(BATCH_CHANNEL_CAPACITY);
    let thread = thread::Builder::new()
        .name(name.into())
        .spawn(move || body(tx));
    BatchStream::new(rx, cancel, thread)
}

/// Start a streaming scan of `request.root`.
///
/// Each call starts a fresh traversal on its own thread and returns
/// immediately.
pub fn scan_stream(request: ScanRequest, cancel: CancelToken) -> BatchStream {
    emit(request, None, cancel)
}

/// Like [`scan_stream`], but never enters `exclude` or anything below it.
///
/// Used to avoid re-scanning a subtree already covered by an earlier pass.
pub fn scan_stream_excluding(
    request: ScanRequest,
    exclude: impl Into<PathBuf>,
    cancel: CancelToken,
) -> BatchStream {
    emit(request, Some(exclude.into()), cancel)
}

fn emit(request: ScanRequest, exclude: Option<PathBuf>, cancel: CancelToken) -> BatchStream {
    let producer_cancel = cancel.clone();
    spawn_producer("cdsleuth-emitter", cancel, move |tx| {
        run_emitter(request, exclude, tx, producer_cancel)
    })
}

fn run_emitter(
    request: ScanRequest,
    exclude: Option<PathBuf>,
    tx: Sender<DirectoryBatch>,
    cancel: CancelToken,
) {
    let start = Instant::now();
    info!("Starting scan of {}", request.root.display());

    let mut batches = BatchState::new(request.initial_batch_size, request.max_batch_size);
    let error = match walk_into(&request, exclude, &tx, &cancel, &mut batches) {
        Ok(()) => None,
        Err(Halt::Failed(err)) => Some(err),
        Err(Halt::Disconnected) => {
            debug!(
                "Consumer of {} went away; stopping scan",
                request.root.display()
            );
            return;
        }
    };
    // A cancel that lands after the walk ran out still wins.
    let error = if cancel.is_cancelled() {
        Some(ScanError::Cancelled)
    } else {
        error
    };

    info!(
        "Scan of {} finished in {:?}: {} directories{}",
        request.root.display(),
        start.elapsed(),
        batches.found(),
        error.as_ref().map(|e| format!(" ({e})")).unwrap_or_default()
    );

    let last = DirectoryBatch::finished(batches.into_remaining(), error);
    deliver_final(&tx, last, &cancel);
}

fn walk_into(
    request: &ScanRequest,
    exclude: Option<PathBuf>,
    tx: &Sender<DirectoryBatch>,
    cancel: &CancelToken,
    batches: &mut BatchState,
) -> Result<(), Halt> {
    let policy = match exclude {
        Some(exclude) => request.policy().excluding(exclude),
        None => request.policy(),
    };
    let walk = DirWalk::open(policy, Traversal::OnDemand, cancel.clone())?;

    for found in walk {
        let dir = found?;
        if batches.push(dir) {
            deliver(tx, DirectoryBatch::progress(batches.copy_out()), cancel)?;
            batches.flushed();
        }
    }
    Ok(())
}

fn deliver(
    tx: &Sender<DirectoryBatch>,
    batch: DirectoryBatch,
    cancel: &CancelToken,
) -> Result<(), Halt> {
    match cancel.send(tx, batch) {
        Ok(()) => Ok(()),
        Err(Blocked::Cancelled(_)) => Err(Halt::Failed(ScanError::Cancelled)),
        Err(Blocked::Disconnected) => Err(Halt::Disconnected),
    }
}

/// Deliver the terminal batch. Blocks until the consumer takes it, except
/// when the scan is cancelled, where the wait is capped at
/// [`CANCELLED_FINAL_GRACE`].
pub(crate) fn deliver_final(
    tx: &Sender<DirectoryBatch>,
    last: DirectoryBatch,
    cancel: &CancelToken,
) {
    let last = match cancel.send(tx, last) {
        Ok(()) => return,
        Err(Blocked::Disconnected) => {
            debug!("Terminal batch dropped: consumer disconnected");
            return;
        }
        Err(Blocked::Cancelled(last)) => last,
    };
    if tx.send_timeout(last, CANCELLED_FINAL_GRACE).is_err() {
        debug!("Terminal batch dropped: consumer not reading after cancel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(i: usize) -> PathBuf {
        PathBuf::from(format!("/d{i}"))
    }

    #[test]
    fn flush_is_due_at_threshold() {
        let mut state = BatchState::new(2, 200);
        assert!(!state.push(dir(0)));
        assert!(state.push(dir(1)));
        assert_eq!(state.copy_out(), vec![dir(0), dir(1)]);
        state.flushed();
        assert!(state.copy_out().is_empty());
        assert_eq!(state.threshold(), 2);
    }

    #[test]
    fn threshold_doubles_after_growth_point_and_caps() {
        let mut state = BatchState::new(50, 200);
        let mut sizes = Vec::new();
        let mut i = 0;
        while sizes.len() < 20 {
            if state.push(dir(i)) {
                sizes.push(state.copy_out().len());
                state.flushed();
            }
            i += 1;
        }
        // 50-directory batches until the count passes 500, then doubling.
        assert!(sizes[..10].iter().all(|&n| n == 50));
        assert_eq!(&sizes[10..14], &[50, 100, 200, 200]);
        assert!(sizes[14..].iter().all(|&n| n == 200));
    }

    #[test]
    fn threshold_never_grows_below_growth_point() {
        let mut state = BatchState::new(10, 200);
        for i in 0..ADAPTIVE_GROWTH_AFTER {
            if state.push(dir(i)) {
                state.flushed();
            }
        }
        assert_eq!(state.threshold(), 10);
    }

    #[test]
    fn remaining_keeps_unflushed_directories() {
        let mut state = BatchState::new(10, 10);
        state.push(dir(1));
        state.push(dir(2));
        assert_eq!(state.found(), 2);
        assert_eq!(state.into_remaining(), vec![dir(1), dir(2)]);
    }

    #[test]
    fn stream_synthesizes_terminal_batch_when_producer_vanishes() {
        let cancel = CancelToken::new();
        let mut stream = spawn_producer("test-producer", cancel, |tx| {
            tx.send(DirectoryBatch::progress(vec![dir(1)])).unwrap();
        });
        let first = stream.recv().unwrap();
        assert!(!first.done);
        let last = stream.recv().unwrap();
        assert!(last.done);
        assert!(matches!(last.error, Some(ScanError::ProducerLost)));
        assert!(stream.recv().is_none());
    }

    #[test]
    fn stream_reports_cancelled_when_producer_gives_up() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut stream = spawn_producer("test-producer", cancel, |_tx| {});
        let last = stream.recv().unwrap();
        assert!(last.done && last.is_cancelled());
        assert!(stream.next().is_none());
    }
}
