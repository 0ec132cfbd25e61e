//! The task that moves scan batches into the shared state.
use crate::refresh::RefreshNotifier;
use crate::state::SharedUiState;
use cdsleuth_core::scanner::BatchStream;
use std::io;
use std::thread;
use tracing::debug;

/// Spawn the scan-relay thread.
///
/// It blocks only on the next batch. Each batch is merged into `state` and
/// followed by a refresh notification. After the terminal batch the thread
/// exits and drops `notifier`, disconnecting the refresh channel.
pub fn spawn_scan_relay(
    stream: BatchStream,
    state: SharedUiState,
    notifier: RefreshNotifier,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("cdsleuth-scan-relay".into())
        .spawn(move || run_relay(stream, state, notifier))
}

fn run_relay(stream: BatchStream, state: SharedUiState, notifier: RefreshNotifier) {
    let mut batches = 0usize;
    for batch in stream {
        batches += 1;
        state.apply_batch(batch);
        notifier.notify();
    }
    debug!(
        "Scan relay finished after {batches} batches, {} directories",
        state.directory_count()
    );
}
