//! Wire messages of the control protocol.
//!
//! ## Requests (one JSON object per line)
//!
//! ```json
//! {"method": "StartRun", "body": {"grid": {...}, "params": {"turns": 100, "width": 16, "height": 16}}}
//! {"method": "PollProgress", "body": {}}
//! {"method": "KeyCommand", "body": {"command": "pause"}}
//! ```
//!
//! ## Responses (one JSON object per line)
//!
//! ```json
//! {"ok": true, "data": { ... }}
//! {"ok": false, "kind": "malformed_params", "error": "turns must be greater than zero"}
//! ```

use serde::{Deserialize, Serialize};

use crate::coordinator::CommandReply;
use crate::models::{Command, Grid, Params, Progress, Snapshot};
use crate::AppError;

/// Status string reported by a successful `StartRun`.
pub const STATUS_OK: &str = "OK";

/// Request sent by a controller, tagged with its method identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", content = "body")]
pub enum Request {
    /// Upload a grid and run it to completion. Blocks until the run ends.
    StartRun(StartRunRequest),
    /// Read the latest committed turn and alive count.
    PollProgress(PollRequest),
    /// Send a side-channel command.
    KeyCommand(KeyCommandRequest),
}

impl Request {
    /// Method identifier, as carried in the `method` tag.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::StartRun(_) => "StartRun",
            Self::PollProgress(_) => "PollProgress",
            Self::KeyCommand(_) => "KeyCommand",
        }
    }
}

/// Body of `StartRun`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartRunRequest {
    /// Initial grid.
    pub grid: Grid,
    /// Run parameters.
    pub params: Params,
}

/// Result of `StartRun`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartRunResponse {
    /// Final grid.
    pub grid: Grid,
    /// Always [`STATUS_OK`] on success.
    pub status: String,
    /// Turns completed before the run ended.
    pub current_turn: usize,
}

impl From<Snapshot> for StartRunResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            grid: (*snapshot.grid).clone(),
            status: STATUS_OK.to_owned(),
            current_turn: snapshot.current_turn,
        }
    }
}

/// Body of `PollProgress`; carries nothing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollRequest {}

/// Result of `PollProgress`.
pub type PollResponse = Progress;

/// Body of `KeyCommand`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyCommandRequest {
    /// Command to apply.
    pub command: Command,
}

/// Result of `KeyCommand`.
///
/// `grid` is present for `save` and `quit` only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyCommandResponse {
    /// Grid at `current_turn`, for commands that return one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<Grid>,
    /// Completed turns when the command was applied.
    pub current_turn: usize,
}

impl From<CommandReply> for KeyCommandResponse {
    fn from(reply: CommandReply) -> Self {
        match reply {
            CommandReply::Progress(progress) => Self {
                grid: None,
                current_turn: progress.current_turn,
            },
            CommandReply::Snapshot(snapshot) => Self {
                grid: Some((*snapshot.grid).clone()),
                current_turn: snapshot.current_turn,
            },
        }
    }
}

/// Response envelope for every method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error kind on failure, see [`AppError::kind`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful response carrying `data`.
    #[must_use]
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            kind: None,
            error: None,
        }
    }

    /// Failed response describing `err`.
    #[must_use]
    pub fn failure(err: &AppError) -> Self {
        Self {
            ok: false,
            data: None,
            kind: Some(err.kind().to_owned()),
            error: Some(err.message().to_owned()),
        }
    }

    /// Serialise `payload` into a successful response.
    #[must_use]
    pub fn from_payload<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(&AppError::from(err)),
        }
    }

    /// Decode the payload of a successful response, or rebuild the error.
    ///
    /// # Errors
    ///
    /// Returns the remote error for failed responses and
    /// `AppError::Protocol` if the payload does not match `T`.
    pub fn into_payload<T: for<'de> Deserialize<'de>>(self) -> crate::Result<T> {
        if !self.ok {
            let message = self.error.unwrap_or_else(|| "unknown error".to_owned());
            return Err(AppError::from_remote(self.kind.as_deref(), message));
        }
        let data = self
            .data
            .ok_or_else(|| AppError::Protocol("successful response without data".into()))?;
        Ok(serde_json::from_value(data)?)
    }
}
