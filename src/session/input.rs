//! Key input for the controller.
//!
//! The terminal delivers whole lines, so each line is scanned for the
//! command keys `s` (save), `q` (quit) and `p` (pause/resume).

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::debug;

/// Key command recognised by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    /// Persist a snapshot of the current turn.
    Save,
    /// Stop the run and end the session.
    Quit,
    /// Toggle between running and paused.
    Pause,
}

impl KeyPress {
    /// Map a key to its command.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            's' => Some(Self::Save),
            'q' => Some(Self::Quit),
            'p' => Some(Self::Pause),
            _ => None,
        }
    }
}

/// Every command key in `line`, in order. Other characters are ignored.
#[must_use]
pub fn parse_line(line: &str) -> Vec<KeyPress> {
    line.chars().filter_map(KeyPress::from_key).collect()
}

/// Forward key presses read from stdin into `tx`.
///
/// Runs on a plain thread because stdin reads cannot be cancelled; the
/// thread exits when stdin closes or the receiver is dropped.
pub fn spawn_stdin_reader(tx: mpsc::Sender<KeyPress>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for key in parse_line(&line) {
                debug!(?key, "key press");
                if tx.blocking_send(key).is_err() {
                    return;
                }
            }
        }
    })
}
