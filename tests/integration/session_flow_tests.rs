//! End-to-end session tests against a live server.
//!
//! Validates the event stream for natural completion, quit, save and
//! pause/resume, and the exit code reported for each outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use life_remote::engine;
use life_remote::models::{Cell, Event, Grid, Params, RunPhase};
use life_remote::persistence::MemoryStore;
use life_remote::rpc::RemoteClient;
use life_remote::session::{KeyPress, SessionController, SessionOutcome};
use life_remote::AppError;

use super::test_helpers::{drain, glider, made_progress, recv_until, spawn_test_server};

const TICK: Duration = Duration::from_millis(5);

async fn remote_session(
    addr: &str,
    store: &Arc<MemoryStore>,
    params: Params,
) -> (SessionController, mpsc::Receiver<Event>) {
    let client = RemoteClient::connect(addr).await.unwrap();
    let (tx, rx) = mpsc::channel(4096);
    let session = SessionController::new(
        Arc::new(client),
        store.clone(),
        store.clone(),
        params,
        tx,
    )
    .with_tick(TICK);
    (session, rx)
}

#[tokio::test]
async fn empty_board_completes_with_no_alive_cells() {
    let server = spawn_test_server().await;
    let store = Arc::new(MemoryStore::with_input(Grid::new(16, 16)));
    let (session, mut rx) = remote_session(&server.addr, &store, Params::new(10, 16, 16)).await;
    let (_keys, key_rx) = mpsc::channel(4);

    let outcome = session.run(key_rx).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Completed { turn: 10 });
    assert_eq!(outcome.exit_code(), 0);

    let events = drain(&mut rx).await;
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::CellFlipped { .. })));

    let tail = &events[events.len() - 3..];
    assert_eq!(
        tail,
        &[
            Event::SnapshotPersisted {
                turn: 10,
                label: "16x16x10".into()
            },
            Event::RunFinished {
                turn: 10,
                alive_cells: Vec::new()
            },
            Event::StateChange {
                turn: 10,
                new_phase: RunPhase::Completed
            },
        ]
    );
    assert_eq!(store.saved().len(), 1);
}

#[tokio::test]
async fn initial_cells_are_flipped_and_final_cells_reported() {
    let server = spawn_test_server().await;
    let initial = glider(16, 16);
    let store = Arc::new(MemoryStore::with_input(initial.clone()));
    let (session, mut rx) = remote_session(&server.addr, &store, Params::new(50, 16, 16)).await;
    let (_keys, key_rx) = mpsc::channel(4);

    let outcome = session.run(key_rx).await.unwrap();
    assert_eq!(outcome.turn(), 50);

    let events = drain(&mut rx).await;
    assert_eq!(events[0], Event::AliveCellsCount { turn: 0, count: 5 });
    let flipped: Vec<Cell> = events
        .iter()
        .filter_map(|e| match e {
            Event::CellFlipped { turn: 0, cell } => Some(*cell),
            _ => None,
        })
        .collect();
    assert_eq!(flipped, engine::alive_cells(&initial));

    let finished = events
        .iter()
        .find_map(|e| match e {
            Event::RunFinished { alive_cells, .. } => Some(alive_cells.clone()),
            _ => None,
        })
        .expect("run finished event");
    assert_eq!(finished, engine::alive_cells(&engine::step_n(&initial, 50)));
}

#[tokio::test]
async fn quit_interrupts_and_exits_nonzero() {
    let server = spawn_test_server().await;
    let store = Arc::new(MemoryStore::with_input(glider(64, 64)));
    let (session, mut rx) =
        remote_session(&server.addr, &store, Params::new(1_000_000_000, 64, 64)).await;
    let (keys, key_rx) = mpsc::channel(4);
    let running = tokio::spawn(session.run(key_rx));

    recv_until(&mut rx, made_progress).await;
    keys.send(KeyPress::Quit).await.unwrap();

    let outcome = running.await.unwrap().unwrap();
    assert!(matches!(outcome, SessionOutcome::Interrupted { .. }));
    assert_eq!(outcome.exit_code(), 1);

    let events = drain(&mut rx).await;
    let tail = &events[events.len() - 3..];
    assert!(matches!(tail[0], Event::SnapshotPersisted { .. }));
    assert!(matches!(tail[1], Event::RunFinished { .. }));
    assert_eq!(
        tail[2],
        Event::StateChange {
            turn: outcome.turn(),
            new_phase: RunPhase::Quitting
        }
    );
    assert_eq!(server.coordinator.phase(), None);
}

#[tokio::test]
async fn quit_right_after_pause_interrupts_the_run() {
    let server = spawn_test_server().await;
    let store = Arc::new(MemoryStore::with_input(glider(64, 64)));
    let (session, mut rx) =
        remote_session(&server.addr, &store, Params::new(1_000_000_000, 64, 64)).await;
    let (keys, key_rx) = mpsc::channel(4);
    let running = tokio::spawn(session.run(key_rx));

    recv_until(&mut rx, made_progress).await;
    keys.send(KeyPress::Pause).await.unwrap();
    keys.send(KeyPress::Quit).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .expect("quit must not wait for a resume")
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, SessionOutcome::Interrupted { .. }));

    let events = drain(&mut rx).await;
    let phases: Vec<RunPhase> = events
        .iter()
        .filter_map(|e| match e {
            Event::StateChange { new_phase, .. } => Some(*new_phase),
            _ => None,
        })
        .collect();
    assert_eq!(phases, [RunPhase::Paused, RunPhase::Quitting]);
    assert_eq!(server.coordinator.phase(), None);
}

#[tokio::test]
async fn transport_failure_ends_the_session_and_aborts_the_run() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (run_seen_tx, run_seen_rx) = oneshot::channel::<()>();
    let (run_closed_tx, run_closed_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        // Control connection: read one request, then hang up without replying
        // once the run connection is in place.
        let (control, _) = listener.accept().await.unwrap();
        tokio::spawn(async move {
            let mut lines = BufReader::new(control).lines();
            let _ = lines.next_line().await;
            let _ = run_seen_rx.await;
        });

        // Run connection: take the StartRun request and never answer it.
        let (run, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(run).lines();
        lines.next_line().await.unwrap().expect("StartRun request");
        let _ = run_seen_tx.send(());
        while let Ok(Some(_)) = lines.next_line().await {}
        let _ = run_closed_tx.send(());
    });

    let store = Arc::new(MemoryStore::with_input(glider(16, 16)));
    let (session, _rx) = remote_session(&addr, &store, Params::new(100, 16, 16)).await;
    let (_keys, key_rx) = mpsc::channel(4);

    let err = tokio::time::timeout(Duration::from_secs(10), session.run(key_rx))
        .await
        .expect("session should fail fast")
        .unwrap_err();
    assert!(matches!(err, AppError::Transport(_)), "got {err:?}");

    tokio::time::timeout(Duration::from_secs(10), run_closed_rx)
        .await
        .expect("run connection should be closed")
        .unwrap();
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn save_persists_a_snapshot_mid_run() {
    let server = spawn_test_server().await;
    let initial = glider(64, 64);
    let store = Arc::new(MemoryStore::with_input(initial.clone()));
    let (session, mut rx) =
        remote_session(&server.addr, &store, Params::new(1_000_000_000, 64, 64)).await;
    let (keys, key_rx) = mpsc::channel(4);
    let running = tokio::spawn(session.run(key_rx));

    recv_until(&mut rx, made_progress).await;
    keys.send(KeyPress::Save).await.unwrap();
    let seen = recv_until(&mut rx, |e| matches!(e, Event::SnapshotPersisted { .. })).await;

    let Some(Event::SnapshotPersisted { turn, label }) = seen.last() else {
        panic!("expected a persisted snapshot");
    };
    assert_eq!(label, &format!("64x64x{turn}"));
    let saved = store.saved();
    assert_eq!(saved[0].0, *label);
    assert_eq!(*saved[0].1.grid, engine::step_n(&initial, *turn));

    keys.send(KeyPress::Quit).await.unwrap();
    running.await.unwrap().unwrap();
    assert_eq!(store.saved().len(), 2);
}

#[tokio::test]
async fn pause_toggles_and_silences_progress() {
    let server = spawn_test_server().await;
    let store = Arc::new(MemoryStore::with_input(glider(64, 64)));
    let (session, mut rx) =
        remote_session(&server.addr, &store, Params::new(1_000_000_000, 64, 64)).await;
    let (keys, key_rx) = mpsc::channel(4);
    let running = tokio::spawn(session.run(key_rx));

    recv_until(&mut rx, made_progress).await;
    keys.send(KeyPress::Pause).await.unwrap();
    let seen = recv_until(&mut rx, |e| matches!(e, Event::StateChange { .. })).await;
    let Some(Event::StateChange { new_phase, .. }) = seen.last() else {
        panic!("expected a state change");
    };
    assert_eq!(*new_phase, RunPhase::Paused);
    assert_eq!(server.coordinator.phase(), Some(RunPhase::Paused));

    tokio::time::sleep(TICK * 10).await;
    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, Event::AliveCellsCount { .. }),
            "no progress reports while paused, got {event:?}"
        );
    }

    keys.send(KeyPress::Pause).await.unwrap();
    let seen = recv_until(&mut rx, |e| matches!(e, Event::StateChange { .. })).await;
    assert!(matches!(
        seen.last(),
        Some(Event::StateChange {
            new_phase: RunPhase::Running,
            ..
        })
    ));
    recv_until(&mut rx, made_progress).await;

    keys.send(KeyPress::Quit).await.unwrap();
    let outcome = running.await.unwrap().unwrap();
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn missing_input_fails_before_starting() {
    let server = spawn_test_server().await;
    let store = Arc::new(MemoryStore::new());
    let (session, _rx) = remote_session(&server.addr, &store, Params::new(10, 16, 16)).await;
    let (_keys, key_rx) = mpsc::channel(4);

    let err = session.run(key_rx).await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)), "got {err:?}");
    assert_eq!(server.coordinator.phase(), None);
}

#[tokio::test]
async fn invalid_params_fail_fast() {
    let server = spawn_test_server().await;
    let store = Arc::new(MemoryStore::with_input(Grid::new(16, 16)));
    let (session, _rx) = remote_session(&server.addr, &store, Params::new(0, 16, 16)).await;
    let (_keys, key_rx) = mpsc::channel(4);

    let err = session.run(key_rx).await.unwrap_err();
    assert!(matches!(err, AppError::MalformedParams(_)));
}
