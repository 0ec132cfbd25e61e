//! Redraw signalling that collapses bursts into one pending refresh.
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Create a linked notifier and receiver.
///
/// The channel holds one signal. While a redraw is pending, further
/// notifications are dropped. Dropping every notifier disconnects the
/// receiver, which tells the main loop no more refreshes will come.
pub fn refresh_channel() -> (RefreshNotifier, Receiver<()>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (RefreshNotifier { tx }, rx)
}

#[derive(Clone, Debug)]
pub struct RefreshNotifier {
    tx: Sender<()>,
}

impl RefreshNotifier {
    /// Ask for a redraw without blocking.
    ///
    /// Returns `false` if a redraw was already pending or nobody is
    /// listening.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => false,
        }
    }
}
