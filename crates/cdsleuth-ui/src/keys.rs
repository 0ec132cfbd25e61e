//! Decoded keystrokes and what they lead to.
use std::path::PathBuf;

/// A keystroke, already decoded by the frontend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// A printable character typed into the filter.
    Char(char),
    Backspace,
    Up,
    Down,
    Enter,
    Escape,
    /// Ctrl-C / Ctrl-Q.
    Quit,
}

/// Result of applying one keystroke to the session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Keep running; the state may have changed.
    Continue,
    /// The user picked this directory.
    Confirmed(PathBuf),
    /// The user backed out, or pressed Enter with nothing selected.
    Cancelled,
}
