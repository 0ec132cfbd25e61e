/// cdsleuth UI -- interactive session over a streaming scan.
///
/// Frontend-agnostic: rendering and input decoding are supplied through the
/// [`Frontend`] trait and a channel of [`InputEvent`]s. Scanning lives in
/// `cdsleuth-core`.
pub mod keys;
pub mod rank;
pub mod refresh;
pub mod relay;
pub mod session;
pub mod state;

pub use keys::{Key, KeyOutcome};
pub use rank::{display_path, Ranker, ScoredMatch, SubsequenceRanker};
pub use session::{Frontend, InputEvent, Session, SessionError, SessionOutcome};
pub use state::{SharedUiState, Snapshot, SnapshotRow};
