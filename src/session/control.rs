//! The seam between a controller session and the coordinator it steers.
//!
//! [`RunControl`] is implemented by [`RemoteClient`] for a coordinator in
//! another process and by [`LocalControl`] for one in this process. The
//! session only ever talks to the trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::coordinator::RunCoordinator;
use crate::models::{Grid, Params, Progress, Snapshot};
use crate::rpc::RemoteClient;
use crate::Result;

/// Boxed future returned by [`RunControl`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Operations a session performs against a coordinator.
pub trait RunControl: Send + Sync {
    /// Start a run and resolve with its final snapshot.
    ///
    /// The future owns everything it needs so it can be spawned and outlive
    /// the borrow of `self`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete, or the
    /// coordinator's rejection.
    fn start_run(&self, grid: Grid, params: Params) -> BoxFuture<'static, Result<Snapshot>>;

    /// Latest committed turn and alive count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    fn poll_progress(&self) -> BoxFuture<'_, Result<Progress>>;

    /// Copy of the grid at the latest committed turn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    fn request_save(&self) -> BoxFuture<'_, Result<Snapshot>>;

    /// Ask the run to stop at the next turn boundary.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    fn request_quit(&self) -> BoxFuture<'_, Result<Snapshot>>;

    /// Pause the run; resolves with the current turn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    fn request_pause(&self) -> BoxFuture<'_, Result<usize>>;

    /// Resume the run; resolves with the current turn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the call cannot complete.
    fn request_resume(&self) -> BoxFuture<'_, Result<usize>>;
}

impl RunControl for RemoteClient {
    fn start_run(&self, grid: Grid, params: Params) -> BoxFuture<'static, Result<Snapshot>> {
        let client = self.clone();
        Box::pin(async move { RemoteClient::start_run(&client, grid, params).await })
    }

    fn poll_progress(&self) -> BoxFuture<'_, Result<Progress>> {
        Box::pin(RemoteClient::poll_progress(self))
    }

    fn request_save(&self) -> BoxFuture<'_, Result<Snapshot>> {
        Box::pin(RemoteClient::request_save(self))
    }

    fn request_quit(&self) -> BoxFuture<'_, Result<Snapshot>> {
        Box::pin(RemoteClient::request_quit(self))
    }

    fn request_pause(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(RemoteClient::request_pause(self))
    }

    fn request_resume(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(RemoteClient::request_resume(self))
    }
}

/// In-process [`RunControl`] backed directly by a coordinator.
#[derive(Debug, Clone, Default)]
pub struct LocalControl {
    coordinator: Arc<RunCoordinator>,
}

impl LocalControl {
    /// Wrap a shared coordinator.
    #[must_use]
    pub fn new(coordinator: Arc<RunCoordinator>) -> Self {
        Self { coordinator }
    }

    /// The coordinator behind this handle.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<RunCoordinator> {
        &self.coordinator
    }
}

impl RunControl for LocalControl {
    fn start_run(&self, grid: Grid, params: Params) -> BoxFuture<'static, Result<Snapshot>> {
        let coordinator = Arc::clone(&self.coordinator);
        Box::pin(async move { coordinator.start(grid, params).await })
    }

    fn poll_progress(&self) -> BoxFuture<'_, Result<Progress>> {
        Box::pin(async move { Ok(self.coordinator.poll()) })
    }

    fn request_save(&self) -> BoxFuture<'_, Result<Snapshot>> {
        Box::pin(async move { Ok(self.coordinator.request_save()) })
    }

    fn request_quit(&self) -> BoxFuture<'_, Result<Snapshot>> {
        Box::pin(async move { Ok(self.coordinator.request_quit()) })
    }

    fn request_pause(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.coordinator.request_pause().current_turn) })
    }

    fn request_resume(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move { Ok(self.coordinator.request_resume().current_turn) })
    }
}
