/// cdsleuth Core -- directory scanning engine.
///
/// This crate contains the scanner and its data model with zero UI
/// dependencies. Frontends consume the batch streams it produces.
///
/// # Modules
///
/// - [`model`] -- Scan requests and directory batches.
/// - [`policy`] -- Depth, ignore-pattern and exclusion rules.
/// - [`scanner`] -- Synchronous, streaming and two-phase scans.
/// - [`cancel`] -- Cooperative cancellation token.
/// - [`config`] -- Settings file loading.
/// - [`error`] -- Error types.
pub mod cancel;
pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod scanner;

pub use cancel::CancelToken;
pub use error::{ConfigError, ScanError};
pub use model::{DirectoryBatch, ScanRequest};
