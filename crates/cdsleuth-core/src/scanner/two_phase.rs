/// Two-phase scanning: the neighbourhood first, then everything else.
///
/// Directories near the user's current location are the likeliest targets,
/// so phase 1 scans the local root and its results reach the consumer before
/// the much larger phase 2 (the filesystem root, with the local subtree
/// excluded) has found anything. Both phases feed one outward stream.
use crate::cancel::{Blocked, CancelToken};
use crate::model::{DirectoryBatch, ScanRequest};
use crate::policy::normalize_lexically;
use crate::scanner::stream::{
    deliver_final, scan_stream, scan_stream_excluding, spawn_producer, BatchStream,
};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Scan the current working directory, then the filesystem root that
/// contains it.
///
/// If the working directory cannot be determined this falls back to a
/// single-phase scan of `request.root`.
pub fn scan_two_phase(request: ScanRequest, cancel: CancelToken) -> BatchStream {
    match std::env::current_dir() {
        Ok(cwd) => {
            let global = filesystem_root(&cwd);
            scan_two_phase_from(request, cwd, global, cancel)
        }
        Err(err) => {
            warn!(
                "Cannot determine working directory ({err}); scanning {} in one phase",
                request.root.display()
            );
            scan_stream(request, cancel)
        }
    }
}

/// Scan `local` first, then `global` with `local` excluded.
///
/// Depth, ignore and batch settings come from `request`; its root is
/// replaced by `local` and `global` in turn. Both paths are normalised
/// lexically first so the exclusion matches however `local` was spelled.
/// The outward stream has a single terminal batch: phase 2's, or phase 1's
/// if phase 1 failed.
pub fn scan_two_phase_from(
    request: ScanRequest,
    local: PathBuf,
    global: PathBuf,
    cancel: CancelToken,
) -> BatchStream {
    let local = normalize_lexically(&local);
    let global = normalize_lexically(&global);
    let relay_cancel = cancel.clone();
    spawn_producer("cdsleuth-two-phase", cancel, move |tx| {
        run_two_phase(request, local, global, tx, relay_cancel)
    })
}

/// The filesystem root containing `path` (`/` on Unix, the drive root on
/// Windows).
pub fn filesystem_root(path: &Path) -> PathBuf {
    path.ancestors().last().unwrap_or(path).to_path_buf()
}

fn run_two_phase(
    request: ScanRequest,
    local: PathBuf,
    global: PathBuf,
    tx: Sender<DirectoryBatch>,
    cancel: CancelToken,
) {
    info!("Phase 1: scanning {}", local.display());
    let phase1 = scan_stream(request.clone().with_root(&local), cancel.clone());
    for batch in phase1 {
        if cancel.is_cancelled() {
            debug!("Cancelled during phase 1");
            return;
        }
        if batch.error.is_some() {
            // Fatal to the whole operation; phase 2 never starts.
            let last = DirectoryBatch::finished(batch.directories, batch.error);
            deliver_final(&tx, last, &cancel);
            return;
        }
        // Phase 1 finishing does not finish the outward stream.
        if !relay(&tx, DirectoryBatch::progress(batch.directories), &cancel) {
            return;
        }
    }

    info!(
        "Phase 2: scanning {} excluding {}",
        global.display(),
        local.display()
    );
    let phase2 = scan_stream_excluding(request.with_root(global), local, cancel.clone());
    for batch in phase2 {
        if cancel.is_cancelled() {
            debug!("Cancelled during phase 2");
            return;
        }
        if batch.done {
            deliver_final(&tx, batch, &cancel);
            return;
        }
        if !relay(&tx, batch, &cancel) {
            return;
        }
    }
}

/// Forward one batch. Returns `false` when relaying should stop.
fn relay(tx: &Sender<DirectoryBatch>, batch: DirectoryBatch, cancel: &CancelToken) -> bool {
    match cancel.send(tx, batch) {
        Ok(()) => true,
        Err(Blocked::Cancelled(_)) => {
            debug!("Relay released by cancellation");
            false
        }
        Err(Blocked::Disconnected) => false,
    }
}
