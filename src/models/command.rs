//! Side-channel commands accepted by the coordinator.

use serde::{Deserialize, Serialize};

/// Request sent to the coordinator alongside a running simulation.
///
/// Commands are consumed at most once. The set is closed: anything else is
/// rejected when the request is deserialised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Read the latest committed turn and alive count.
    Poll,
    /// Halt turn advancement at the next boundary.
    Pause,
    /// Continue after a pause.
    #[serde(rename = "unpause", alias = "resume")]
    Resume,
    /// Copy out the current grid without affecting progression.
    Save,
    /// Stop at the next boundary and produce a final snapshot.
    Quit,
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Pause => "pause",
            Self::Resume => "unpause",
            Self::Save => "save",
            Self::Quit => "quit",
        }
    }

    /// Whether the reply to this command carries a grid.
    #[must_use]
    pub const fn returns_grid(self) -> bool {
        matches!(self, Self::Save | Self::Quit)
    }
}
