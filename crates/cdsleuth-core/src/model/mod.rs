/// Data model for scan requests and their batched results.
pub mod batch;
pub mod request;

pub use batch::DirectoryBatch;
pub use request::{
    ScanRequest, DEFAULT_INITIAL_BATCH_SIZE, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_DEPTH,
};
