/// The interactive session: one scan, one shared state, one main loop.
///
/// A session owns the scan-relay thread and the refresh receiver. `run`
/// draws, then waits for either the next input event or the next refresh
/// signal, until a keystroke confirms or cancels. Ending the session in any
/// way cancels the scan.
use crate::keys::{Key, KeyOutcome};
use crate::rank::{Ranker, SubsequenceRanker};
use crate::refresh::refresh_channel;
use crate::relay::spawn_scan_relay;
use crate::state::{SharedUiState, Snapshot};
use cdsleuth_core::scanner::BatchStream;
use cdsleuth_core::{CancelToken, ScanError};
use crossbeam_channel::{never, select, Receiver};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Something that can show a [`Snapshot`] to the user.
pub trait Frontend {
    fn draw(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

/// Input delivered to the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    /// The frontend now has room for this many result rows.
    Resize { rows: usize },
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Selected(PathBuf),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("scanning error")]
    Scan(#[source] ScanError),

    #[error("failed to render")]
    Render(#[source] io::Error),

    #[error("failed to start scan relay")]
    Spawn(#[source] io::Error),
}

pub struct Session {
    state: SharedUiState,
    refresh: Receiver<()>,
    cancel: CancelToken,
    _relay: thread::JoinHandle<()>,
}

impl Session {
    /// Start relaying `stream` into a fresh state ranked by the built-in
    /// [`SubsequenceRanker`].
    pub fn start(stream: BatchStream) -> Result<Self, SessionError> {
        Self::with_ranker(stream, Arc::new(SubsequenceRanker::new()))
    }

    pub fn with_ranker(
        stream: BatchStream,
        ranker: Arc<dyn Ranker>,
    ) -> Result<Self, SessionError> {
        let cancel = stream.cancel_token().clone();
        let state = SharedUiState::new(ranker);
        let (notifier, refresh) = refresh_channel();
        let relay = spawn_scan_relay(stream, state.clone(), notifier).map_err(|err| {
            cancel.cancel();
            SessionError::Spawn(err)
        })?;
        Ok(Self {
            state,
            refresh,
            cancel,
            _relay: relay,
        })
    }

    pub fn state(&self) -> &SharedUiState {
        &self.state
    }

    /// Run the main loop until the user confirms or cancels.
    ///
    /// A disconnected `input` counts as a cancellation, and so does the
    /// scan's token being raised from elsewhere (a signal handler, say). A
    /// scan error other than cancellation ends the session with
    /// [`SessionError::Scan`].
    pub fn run<F: Frontend>(
        &mut self,
        frontend: &mut F,
        input: &Receiver<InputEvent>,
    ) -> Result<SessionOutcome, SessionError> {
        let mut refresh = self.refresh.clone();
        let stop = self.cancel.signal().clone();
        let mut relay_gone = false;
        loop {
            if self.cancel.is_cancelled() {
                debug!("Scan cancelled outside the session");
                return Ok(SessionOutcome::Cancelled);
            }
            if let Some(err) = self.state.take_scan_error() {
                self.cancel.cancel();
                return Err(SessionError::Scan(err));
            }

            let snapshot = self.state.snapshot(self.state.page_size());
            frontend.draw(&snapshot).map_err(SessionError::Render)?;

            select! {
                recv(input) -> event => match event {
                    Ok(InputEvent::Key(key)) => match self.state.handle_key(key) {
                        KeyOutcome::Continue => {}
                        KeyOutcome::Confirmed(path) => {
                            info!("Selected {}", path.display());
                            self.cancel.cancel();
                            return Ok(SessionOutcome::Selected(path));
                        }
                        KeyOutcome::Cancelled => {
                            debug!("Session cancelled by user");
                            self.cancel.cancel();
                            return Ok(SessionOutcome::Cancelled);
                        }
                    },
                    Ok(InputEvent::Resize { rows }) => self.state.set_page_size(rows),
                    Err(_) => {
                        debug!("Input closed; cancelling session");
                        self.cancel.cancel();
                        return Ok(SessionOutcome::Cancelled);
                    }
                },
                recv(refresh) -> signal => relay_gone = signal.is_err(),
                // Only ever disconnects; the top of the loop reports it.
                recv(stop) -> _ => {}
            }
            if relay_gone {
                // Only input can wake the loop from here on.
                refresh = never();
                relay_gone = false;
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
