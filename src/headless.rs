//! A frontend with no terminal: it logs progress and confirms the best match
//! once the scan is finished.
use cdsleuth_ui::{Frontend, InputEvent, Key, Snapshot};
use crossbeam_channel::Sender;
use std::io;
use tracing::debug;

pub struct HeadlessFrontend {
    input: Sender<InputEvent>,
    confirmed: bool,
    seen: usize,
}

impl HeadlessFrontend {
    /// Type `query` into `input` and return a frontend that sends Enter
    /// after the scan completes.
    pub fn new(input: Sender<InputEvent>, query: &str) -> io::Result<Self> {
        for c in query.chars() {
            send(&input, Key::Char(c))?;
        }
        Ok(Self {
            input,
            confirmed: false,
            seen: 0,
        })
    }
}

impl Frontend for HeadlessFrontend {
    fn draw(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        if snapshot.total_directories != self.seen {
            self.seen = snapshot.total_directories;
            debug!(
                "{} directories, {} matching {:?}",
                snapshot.total_directories, snapshot.total_matches, snapshot.query
            );
        }
        if snapshot.scan_complete && !self.confirmed {
            self.confirmed = true;
            send(&self.input, Key::Enter)?;
        }
        Ok(())
    }
}

fn send(input: &Sender<InputEvent>, key: Key) -> io::Result<()> {
    input
        .send(InputEvent::Key(key))
        .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "input loop is gone"))
}
