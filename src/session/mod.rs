//! Client-side session: starts a remote run and steers it.
//!
//! [`SessionController::run`] loads the initial grid, starts the run as a
//! background task and then reacts to three sources until the session ends:
//!
//! 1. a timer, which polls progress while the session is playing;
//! 2. key presses (save, quit, pause/resume);
//! 3. completion of the run itself.
//!
//! Play/pause status is owned by the event loop and changed only by key
//! handling on that one task, and always together with the matching remote
//! call. Any failed remote call ends the session with that error.

pub mod control;
pub mod input;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::engine;
use crate::models::{Event, Params, RunPhase, Snapshot};
use crate::persistence::{GridSource, SnapshotStore};
use crate::{AppError, Result};

pub use control::{LocalControl, RunControl};
pub use input::KeyPress;

/// Default period between progress polls.
pub const DEFAULT_TICK: Duration = Duration::from_secs(2);

/// Local play/pause status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStatus {
    /// Progress is polled on every tick.
    Play,
    /// The remote run is paused; ticks are ignored.
    Pause,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every requested turn was computed.
    Completed {
        /// Final turn.
        turn: usize,
    },
    /// The user quit before the run finished.
    Interrupted {
        /// Turn the run stopped at.
        turn: usize,
    },
}

impl SessionOutcome {
    /// Process exit code: 0 for completion, 1 for an interrupted run.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Interrupted { .. } => 1,
        }
    }

    /// Final turn.
    #[must_use]
    pub const fn turn(self) -> usize {
        match self {
            Self::Completed { turn } | Self::Interrupted { turn } => turn,
        }
    }
}

/// Drives one run from the client side.
pub struct SessionController {
    control: Arc<dyn RunControl>,
    source: Arc<dyn GridSource>,
    store: Arc<dyn SnapshotStore>,
    params: Params,
    tick: Duration,
    events: mpsc::Sender<Event>,
}

impl SessionController {
    /// Build a session. Events are sent to `events`; the channel closes when
    /// the session ends.
    #[must_use]
    pub fn new(
        control: Arc<dyn RunControl>,
        source: Arc<dyn GridSource>,
        store: Arc<dyn SnapshotStore>,
        params: Params,
        events: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            control,
            source,
            store,
            params,
            tick: DEFAULT_TICK,
            events,
        }
    }

    /// Override the poll period.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run the session to its end.
    ///
    /// # Errors
    ///
    /// - `AppError::MalformedParams` if the parameters are invalid.
    /// - `AppError::Persistence` if the input cannot be loaded or a snapshot
    ///   cannot be written.
    /// - `AppError::Transport` (or the coordinator's rejection) if a remote
    ///   call fails. The run task is aborted before returning.
    pub async fn run(self, keys: mpsc::Receiver<KeyPress>) -> Result<SessionOutcome> {
        let span = info_span!(
            "session",
            turns = self.params.turns,
            width = self.params.width,
            height = self.params.height
        );
        async move {
            self.params.validate()?;
            let initial = self
                .source
                .load(self.params.width, self.params.height)
                .await?;
            self.params.ensure_matches(&initial)?;

            let alive = engine::alive_cells(&initial);
            self.emit(Event::AliveCellsCount {
                turn: 0,
                count: alive.len(),
            })
            .await;
            for cell in alive {
                self.emit(Event::CellFlipped { turn: 0, cell }).await;
            }

            info!("starting run");
            let mut run = tokio::spawn(self.control.start_run(initial, self.params));
            let result = self.event_loop(&mut run, keys).await;
            if result.is_err() {
                run.abort();
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn event_loop(
        &self,
        run: &mut JoinHandle<Result<Snapshot>>,
        mut keys: mpsc::Receiver<KeyPress>,
    ) -> Result<SessionOutcome> {
        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut status = PlayStatus::Play;
        let mut keys_open = true;

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if status == PlayStatus::Play {
                        let progress = self.control.poll_progress().await?;
                        self.emit(Event::AliveCellsCount {
                            turn: progress.current_turn,
                            count: progress.alive_count,
                        })
                        .await;
                    }
                }
                key = keys.recv(), if keys_open => match key {
                    Some(KeyPress::Pause) => {
                        status = self.toggle_pause(status).await?;
                    }
                    Some(KeyPress::Save) => {
                        let snapshot = self.control.request_save().await?;
                        self.persist(&snapshot).await?;
                    }
                    Some(KeyPress::Quit) => {
                        if !run.is_finished() {
                            let requested = self.control.request_quit().await?;
                            debug!(turn = requested.current_turn, "quit acknowledged");
                        }
                        let snapshot = join_run(run).await?;
                        // A run that reached its last turn before the quit landed
                        // is reported as completed.
                        let terminal = if snapshot.current_turn >= self.params.turns {
                            RunPhase::Completed
                        } else {
                            RunPhase::Quitting
                        };
                        return self.finish(&snapshot, terminal).await;
                    }
                    None => {
                        debug!("key input closed");
                        keys_open = false;
                    }
                },
                joined = &mut *run => {
                    let snapshot = flatten(joined)?;
                    return self.finish(&snapshot, RunPhase::Completed).await;
                }
            }
        }
    }

    async fn toggle_pause(&self, status: PlayStatus) -> Result<PlayStatus> {
        match status {
            PlayStatus::Play => {
                let turn = self.control.request_pause().await?;
                info!(turn, "paused");
                self.emit(Event::StateChange {
                    turn,
                    new_phase: RunPhase::Paused,
                })
                .await;
                Ok(PlayStatus::Pause)
            }
            PlayStatus::Pause => {
                let turn = self.control.request_resume().await?;
                info!(turn, "continuing");
                self.emit(Event::StateChange {
                    turn,
                    new_phase: RunPhase::Running,
                })
                .await;
                Ok(PlayStatus::Play)
            }
        }
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let label = self.store.persist(snapshot).await?;
        self.emit(Event::SnapshotPersisted {
            turn: snapshot.current_turn,
            label,
        })
        .await;
        Ok(())
    }

    async fn finish(&self, snapshot: &Snapshot, terminal: RunPhase) -> Result<SessionOutcome> {
        let turn = snapshot.current_turn;
        self.persist(snapshot).await?;
        self.emit(Event::RunFinished {
            turn,
            alive_cells: engine::alive_cells(&snapshot.grid),
        })
        .await;
        self.emit(Event::StateChange {
            turn,
            new_phase: terminal,
        })
        .await;

        let outcome = if terminal == RunPhase::Quitting {
            SessionOutcome::Interrupted { turn }
        } else {
            SessionOutcome::Completed { turn }
        };
        info!(?outcome, "session finished");
        Ok(outcome)
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            warn!("event sink closed, dropping event");
        }
    }
}

async fn join_run(run: &mut JoinHandle<Result<Snapshot>>) -> Result<Snapshot> {
    flatten(run.await)
}

fn flatten(joined: std::result::Result<Result<Snapshot>, tokio::task::JoinError>) -> Result<Snapshot> {
    joined.map_err(|err| AppError::Transport(format!("run task failed: {err}")))?
}
