//! Controller-side connection to a remote coordinator.
//!
//! A [`RemoteClient`] owns one control connection for side-channel calls and
//! opens a dedicated connection for each `StartRun`, so a long run never
//! queues polls or key commands behind it. Dropping the client (and any
//! in-flight `start_run` future) closes its sockets.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use crate::models::{Command, Grid, Params, Progress, Snapshot};
use crate::rpc::codec::LineCodec;
use crate::rpc::protocol::{
    KeyCommandRequest, KeyCommandResponse, PollRequest, Request, Response, StartRunRequest,
    StartRunResponse,
};
use crate::{AppError, Result};

/// One framed TCP connection carrying request/response pairs.
struct Connection {
    reader: FramedRead<OwnedReadHalf, LineCodec>,
    writer: FramedWrite<OwnedWriteHalf, LineCodec>,
}

impl Connection {
    async fn open(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|err| AppError::Transport(format!("failed to connect to {addr}: {err}")))?;
        if let Err(err) = stream.set_nodelay(true) {
            debug!(%addr, %err, "failed to set TCP_NODELAY");
        }
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: FramedRead::new(reader, LineCodec::new()),
            writer: FramedWrite::new(writer, LineCodec::new()),
        })
    }

    async fn call<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T> {
        let method = request.method();
        let line = serde_json::to_string(request)?;
        self.writer
            .send(line)
            .await
            .map_err(|err| AppError::Transport(format!("{method}: {}", err.message())))?;

        let reply = match self.reader.next().await {
            Some(Ok(reply)) => reply,
            Some(Err(err)) => {
                return Err(AppError::Transport(format!("{method}: {}", err.message())))
            }
            None => {
                return Err(AppError::Transport(format!(
                    "{method}: connection closed before a response arrived"
                )))
            }
        };
        let response: Response = serde_json::from_str(reply.trim())?;
        response.into_payload()
    }
}

/// Handle to a remote coordinator, passed to a session at construction.
///
/// Cheap to clone; clones share the control connection.
#[derive(Clone)]
pub struct RemoteClient {
    addr: Arc<str>,
    control: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Connect the control channel to `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the server is unreachable.
    pub async fn connect(addr: &str) -> Result<Self> {
        let control = Connection::open(addr).await?;
        info!(%addr, "connected to coordinator");
        Ok(Self {
            addr: Arc::from(addr),
            control: Arc::new(Mutex::new(control)),
        })
    }

    /// Server address this client talks to.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Upload `grid` and block until the run ends, on a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete, or the
    /// server's rejection (for example `AppError::MalformedParams`).
    pub async fn start_run(&self, grid: Grid, params: Params) -> Result<Snapshot> {
        let mut conn = Connection::open(&self.addr).await?;
        debug!(turns = params.turns, "StartRun sent");
        let response: StartRunResponse = conn
            .call(&Request::StartRun(StartRunRequest { grid, params }))
            .await?;
        if response.status != crate::rpc::protocol::STATUS_OK {
            return Err(AppError::Protocol(format!(
                "unexpected run status '{}'",
                response.status
            )));
        }
        Ok(Snapshot::new(Arc::new(response.grid), response.current_turn))
    }

    /// Latest committed turn and alive count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    pub async fn poll_progress(&self) -> Result<Progress> {
        self.control
            .lock()
            .await
            .call(&Request::PollProgress(PollRequest::default()))
            .await
    }

    /// Send a side-channel command.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    pub async fn key_command(&self, command: Command) -> Result<KeyCommandResponse> {
        self.control
            .lock()
            .await
            .call(&Request::KeyCommand(KeyCommandRequest { command }))
            .await
    }

    async fn snapshot_command(&self, command: Command) -> Result<Snapshot> {
        let response = self.key_command(command).await?;
        let grid = response.grid.unwrap_or_else(Grid::empty);
        Ok(Snapshot::new(Arc::new(grid), response.current_turn))
    }

    /// Copy of the remote grid at its latest committed turn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    pub async fn request_save(&self) -> Result<Snapshot> {
        self.snapshot_command(Command::Save).await
    }

    /// Ask the run to stop; returns the state as of the request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    pub async fn request_quit(&self) -> Result<Snapshot> {
        self.snapshot_command(Command::Quit).await
    }

    /// Pause the run; returns the turn at which the request was applied.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    pub async fn request_pause(&self) -> Result<usize> {
        Ok(self.key_command(Command::Pause).await?.current_turn)
    }

    /// Resume the run; returns the turn at which the request was applied.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    pub async fn request_resume(&self) -> Result<usize> {
        Ok(self.key_command(Command::Resume).await?.current_turn)
    }
}
