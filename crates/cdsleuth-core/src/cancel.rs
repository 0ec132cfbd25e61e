//! Cooperative cancellation shared between a consumer and its producers.
//!
//! A [`CancelToken`] is cloned and passed explicitly down to every thread that
//! takes part in a scan. Loops poll [`CancelToken::is_cancelled`] once per
//! entry. Threads blocked on a full channel wait on [`CancelToken::signal`]
//! alongside the send, so raising the token also wakes them.
use crossbeam_channel::{Receiver, Select, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    /// Dropped on cancel, which disconnects `signal` for every clone.
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

/// A one-shot cancellation flag. Once raised it stays raised.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.trigger.lock().take();
    }

    /// Non-blocking check.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// A receiver that becomes ready (disconnected) once the token is raised.
    ///
    /// Never carries a message; use it as a `select` arm.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Send `msg`, blocking while the channel is full, unless cancellation
    /// arrives first.
    ///
    /// On cancellation the unsent message is handed back so the caller can
    /// decide what to do with it.
    pub fn send<T>(&self, tx: &Sender<T>, msg: T) -> Result<(), Blocked<T>> {
        if self.is_cancelled() {
            return Err(Blocked::Cancelled(msg));
        }

        let mut sel = Select::new();
        let send_idx = sel.send(tx);
        let cancel_idx = sel.recv(self.signal());
        let oper = sel.select();
        match oper.index() {
            i if i == send_idx => oper.send(tx, msg).map_err(|_| Blocked::Disconnected),
            i => {
                debug_assert_eq!(i, cancel_idx);
                // The signal never carries a value; completing the op only
                // observes the disconnect.
                let _ = oper.recv(self.signal());
                Err(Blocked::Cancelled(msg))
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Why [`CancelToken::send`] did not deliver.
#[derive(Debug)]
pub enum Blocked<T> {
    /// Cancellation was raised first. Carries the undelivered message.
    Cancelled(T),
    /// The receiving side has been dropped.
    Disconnected,
}
