/// Scanner module -- directory discovery.
///
/// Three entry points, from simplest to richest:
/// - [`scan`] walks a tree to completion and returns the full list.
/// - [`scan_stream`] walks on a background thread and streams adaptively
///   sized [`DirectoryBatch`](crate::model::DirectoryBatch)es over a bounded
///   channel, with cooperative cancellation.
/// - [`scan_two_phase`] streams the working directory first and then the rest
///   of the filesystem, without visiting the overlap twice.
pub mod stream;
pub mod two_phase;
pub mod walk;

pub use stream::{
    scan_stream, scan_stream_excluding, BatchStream, ADAPTIVE_GROWTH_AFTER,
    BATCH_CHANNEL_CAPACITY,
};
pub use two_phase::{filesystem_root, scan_two_phase, scan_two_phase_from};
pub use walk::{scan, scan_directories};
