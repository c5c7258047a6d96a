//! Server-side owner of the single in-flight run.
//!
//! [`RunCoordinator::start`] drives the turn loop; every other method is a
//! side channel that may be called concurrently from other connections.
//!
//! All run state sits behind one mutex that is held only for the duration
//! of a single transition (commit a turn, change phase, copy a snapshot).
//! The step computation itself runs unlocked on a blocking worker thread,
//! so polls and saves always see the last fully committed turn.
//!
//! Pausing is checked at turn boundaries. The paused wait listens for two
//! signals: the resume [`Notify`], which keeps at most one permit so a
//! resume is never lost, and the run's quit [`CancellationToken`], so a quit
//! lands even when nobody resumes first.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::engine;
use crate::models::{Command, Grid, Params, Progress, RunPhase, Snapshot};
use crate::{AppError, Result};

/// Reply to a side-channel [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Reply to `Poll`, `Pause` and `Resume`.
    Progress(Progress),
    /// Reply to `Save` and `Quit`.
    Snapshot(Snapshot),
}

impl CommandReply {
    /// Turn the reply refers to.
    #[must_use]
    pub fn current_turn(&self) -> usize {
        match self {
            Self::Progress(progress) => progress.current_turn,
            Self::Snapshot(snapshot) => snapshot.current_turn,
        }
    }
}

/// State of the run currently owned by the coordinator.
#[derive(Debug)]
struct RunState {
    run_id: Uuid,
    grid: Arc<Grid>,
    alive_count: usize,
    current_turn: usize,
    target_turns: usize,
    phase: RunPhase,
    quit: CancellationToken,
}

impl RunState {
    fn progress(&self) -> Progress {
        Progress {
            alive_count: self.alive_count,
            current_turn: self.current_turn,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(Arc::clone(&self.grid), self.current_turn)
    }
}

#[derive(Debug, Default)]
struct Slot {
    active: Option<RunState>,
    /// Final progress of the last run, handed out by the first poll after it.
    finished: Option<Progress>,
}

/// Owns at most one run and serialises every read and write of its state.
#[derive(Debug, Default)]
pub struct RunCoordinator {
    slot: Mutex<Slot>,
    resume: Notify,
}

/// Clears the active run if `start` is abandoned before it finishes.
///
/// Only the run this guard was armed for is cleared; by the time the guard
/// drops, a later `start` may already own the slot.
struct ResetOnDrop<'a> {
    coordinator: &'a RunCoordinator,
    run_id: Uuid,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        let mut slot = self.coordinator.lock();
        if let Some(state) = slot.active.take_if(|state| state.run_id == self.run_id) {
            warn!(run_id = %state.run_id, turn = state.current_turn, "run abandoned, state reset");
        }
    }
}

impl RunCoordinator {
    /// Construct an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every transition writes whole fields, so a poisoned guard still holds
    // a consistent state.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `initial` forward for `params.turns` generations and return the
    /// final snapshot.
    ///
    /// Completes early if a quit is requested. The coordinator is idle again
    /// once this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - `AppError::MalformedParams` if the parameters are non-positive or do
    ///   not match the grid.
    /// - `AppError::RunInProgress` if another run is active.
    /// - `AppError::Io` if a step computation task fails.
    pub async fn start(&self, initial: Grid, params: Params) -> Result<Snapshot> {
        params.validate()?;
        params.ensure_matches(&initial)?;

        let run_id = Uuid::new_v4();
        let quit = CancellationToken::new();
        let grid = Arc::new(initial);
        {
            let mut slot = self.lock();
            if let Some(active) = slot.active.as_ref() {
                return Err(AppError::RunInProgress(format!(
                    "run {} is at turn {}",
                    active.run_id, active.current_turn
                )));
            }
            slot.finished = None;
            slot.active = Some(RunState {
                run_id,
                alive_count: engine::alive_count(&grid),
                grid: Arc::clone(&grid),
                current_turn: 0,
                target_turns: params.turns,
                phase: RunPhase::Running,
                quit: quit.clone(),
            });
        }
        let reset = ResetOnDrop {
            coordinator: self,
            run_id,
        };

        let span = info_span!(
            "run",
            %run_id,
            turns = params.turns,
            width = params.width,
            height = params.height
        );
        self.drive(grid, params.turns, &quit)
            .instrument(span.clone())
            .await?;

        let mut slot = self.lock();
        let mut state = slot
            .active
            .take_if(|state| state.run_id == run_id)
            .ok_or_else(|| AppError::Io("run state vanished before completion".into()))?;
        state.phase = RunPhase::Completed;
        slot.finished = Some(state.progress());
        drop(slot);
        drop(reset);

        span.in_scope(|| {
            info!(
                turn = state.current_turn,
                alive = state.alive_count,
                "run completed"
            );
        });
        Ok(state.snapshot())
    }

    async fn drive(&self, mut grid: Arc<Grid>, turns: usize, quit: &CancellationToken) -> Result<()> {
        for _ in 0..turns {
            if !self.checkpoint(quit).await {
                break;
            }

            let current = Arc::clone(&grid);
            let (next, alive) = tokio::task::spawn_blocking(move || {
                let next = engine::step(&current);
                let alive = engine::alive_count(&next);
                (next, alive)
            })
            .await
            .map_err(|err| AppError::Io(format!("step task failed: {err}")))?;

            grid = Arc::new(next);
            self.commit(Arc::clone(&grid), alive);
        }
        Ok(())
    }

    /// Turn-boundary check. Returns `false` when the loop must stop.
    async fn checkpoint(&self, quit: &CancellationToken) -> bool {
        loop {
            let phase = self
                .lock()
                .active
                .as_ref()
                .map_or(RunPhase::Quitting, |state| state.phase);

            match phase {
                RunPhase::Running => return true,
                RunPhase::Quitting | RunPhase::Completed => {
                    debug!("stopping at turn boundary");
                    return false;
                }
                RunPhase::Paused => {
                    debug!("paused at turn boundary");
                    // Re-check the phase after every wake-up; a permit left
                    // over from an earlier resume must not release the wait.
                    tokio::select! {
                        () = self.resume.notified() => {}
                        () = quit.cancelled() => return false,
                    }
                }
            }
        }
    }

    fn commit(&self, grid: Arc<Grid>, alive_count: usize) {
        let mut slot = self.lock();
        if let Some(state) = slot.active.as_mut() {
            state.grid = grid;
            state.alive_count = alive_count;
            state.current_turn += 1;
            debug!(
                turn = state.current_turn,
                of = state.target_turns,
                alive = alive_count,
                "turn committed"
            );
        }
    }

    /// Latest committed turn and alive count.
    ///
    /// Zeros when idle; after a run completes, its final values are returned
    /// once before falling back to zeros.
    pub fn poll(&self) -> Progress {
        let mut slot = self.lock();
        match slot.active.as_ref() {
            Some(state) => state.progress(),
            None => slot.finished.take().unwrap_or_default(),
        }
    }

    /// Halt turn advancement at the next boundary.
    ///
    /// No effect when idle, already paused or quitting.
    pub fn request_pause(&self) -> Progress {
        let mut slot = self.lock();
        let Some(state) = slot.active.as_mut() else {
            return Progress::default();
        };
        if state.phase == RunPhase::Running {
            state.phase = RunPhase::Paused;
            info!(run_id = %state.run_id, turn = state.current_turn, "pause requested");
        }
        state.progress()
    }

    /// Continue a paused run. A resume without a preceding pause is a no-op.
    pub fn request_resume(&self) -> Progress {
        let mut slot = self.lock();
        let Some(state) = slot.active.as_mut() else {
            return Progress::default();
        };
        if state.phase == RunPhase::Paused {
            state.phase = RunPhase::Running;
            info!(run_id = %state.run_id, turn = state.current_turn, "resume requested");
            self.resume.notify_one();
        }
        state.progress()
    }

    /// Copy of the committed grid and turn. Progression is unaffected.
    pub fn request_save(&self) -> Snapshot {
        self.lock()
            .active
            .as_ref()
            .map_or_else(Snapshot::empty, RunState::snapshot)
    }

    /// Stop the run at the next boundary and return the state as of this
    /// call. Works while paused. The final snapshot is the one `start`
    /// returns.
    pub fn request_quit(&self) -> Snapshot {
        let mut slot = self.lock();
        let Some(state) = slot.active.as_mut() else {
            return Snapshot::empty();
        };
        if matches!(state.phase, RunPhase::Running | RunPhase::Paused) {
            state.phase = RunPhase::Quitting;
            state.quit.cancel();
            info!(run_id = %state.run_id, turn = state.current_turn, "quit requested");
        }
        state.snapshot()
    }

    /// Phase of the active run, `None` when idle.
    #[must_use]
    pub fn phase(&self) -> Option<RunPhase> {
        self.lock().active.as_ref().map(|state| state.phase)
    }

    /// Apply a side-channel command.
    pub fn handle(&self, command: Command) -> CommandReply {
        match command {
            Command::Poll => CommandReply::Progress(self.poll()),
            Command::Pause => CommandReply::Progress(self.request_pause()),
            Command::Resume => CommandReply::Progress(self.request_resume()),
            Command::Save => CommandReply::Snapshot(self.request_save()),
            Command::Quit => CommandReply::Snapshot(self.request_quit()),
        }
    }
}
