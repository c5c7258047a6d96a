//! Unit tests for the session event loop against a scripted `RunControl`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

use life_remote::engine;
use life_remote::models::{Cell, Event, Grid, Params, Progress, RunPhase, Snapshot};
use life_remote::persistence::MemoryStore;
use life_remote::session::control::BoxFuture;
use life_remote::session::{KeyPress, RunControl, SessionController, SessionOutcome};
use life_remote::Result;

/// Run that computes every turn but only reports back once a quit arrives,
/// like a `StartRun` response still in flight when the key is pressed.
#[derive(Default)]
struct FinishesAsQuitArrives {
    released: Arc<Notify>,
}

impl RunControl for FinishesAsQuitArrives {
    fn start_run(&self, grid: Grid, params: Params) -> BoxFuture<'static, Result<Snapshot>> {
        let released = Arc::clone(&self.released);
        Box::pin(async move {
            released.notified().await;
            let last = engine::step_n(&grid, params.turns);
            Ok(Snapshot::new(Arc::new(last), params.turns))
        })
    }

    fn poll_progress(&self) -> BoxFuture<'_, Result<Progress>> {
        Box::pin(async { Ok(Progress::default()) })
    }

    fn request_save(&self) -> BoxFuture<'_, Result<Snapshot>> {
        Box::pin(async { Ok(Snapshot::empty()) })
    }

    fn request_quit(&self) -> BoxFuture<'_, Result<Snapshot>> {
        Box::pin(async {
            // The coordinator is already idle, so the reply is zeroed.
            self.released.notify_one();
            Ok(Snapshot::empty())
        })
    }

    fn request_pause(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async { Ok(0) })
    }

    fn request_resume(&self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async { Ok(0) })
    }
}

fn blinker() -> Grid {
    let cells = [(1, 0), (1, 1), (1, 2)].map(|(x, y)| Cell::new(x, y));
    Grid::from_alive_cells(5, 5, &cells).unwrap()
}

#[tokio::test]
async fn quit_after_the_last_turn_reports_completion() {
    let store = Arc::new(MemoryStore::with_input(blinker()));
    let (tx, mut rx) = mpsc::channel(64);
    let (keys, key_rx) = mpsc::channel(4);
    let session = SessionController::new(
        Arc::new(FinishesAsQuitArrives::default()),
        store.clone(),
        store.clone(),
        Params::new(7, 5, 5),
        tx,
    )
    .with_tick(Duration::from_secs(3600));
    let running = tokio::spawn(session.run(key_rx));

    keys.send(KeyPress::Quit).await.unwrap();
    let outcome = running.await.unwrap().unwrap();
    assert_eq!(outcome, SessionOutcome::Completed { turn: 7 });
    assert_eq!(outcome.exit_code(), 0);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events[0], Event::AliveCellsCount { turn: 0, count: 3 });
    assert_eq!(
        events.last(),
        Some(&Event::StateChange {
            turn: 7,
            new_phase: RunPhase::Completed
        })
    );
    assert_eq!(store.saved()[0].0, "5x5x7");
}
