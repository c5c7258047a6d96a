//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use life_remote::models::{Cell, Event, Grid};
use life_remote::rpc::server;
use life_remote::RunCoordinator;

/// Running server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: String,
    pub coordinator: Arc<RunCoordinator>,
    pub ct: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.ct.cancel();
    }
}

pub async fn spawn_test_server() -> TestServer {
    let listener = server::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    let coordinator = Arc::new(RunCoordinator::new());
    let ct = CancellationToken::new();
    server::spawn_server(listener, Arc::clone(&coordinator), ct.clone());
    TestServer {
        addr,
        coordinator,
        ct,
    }
}

pub fn glider(width: usize, height: usize) -> Grid {
    let cells = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)].map(|(x, y)| Cell::new(x, y));
    Grid::from_alive_cells(width, height, &cells).expect("glider fits")
}

/// Receive events until one matches `pred`, returning everything seen.
pub async fn recv_until(
    rx: &mut mpsc::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = rx.recv().await {
            let done = pred(&event);
            seen.push(event);
            if done {
                return;
            }
        }
        panic!("event stream closed before the expected event");
    })
    .await
    .expect("expected event should arrive");
    seen
}

/// Progress report from a run that has committed at least one turn.
pub fn made_progress(event: &Event) -> bool {
    matches!(event, Event::AliveCellsCount { turn, .. } if *turn > 0)
}

/// Drain whatever is left once the sender side has closed.
pub async fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut rest = Vec::new();
    while let Some(event) = rx.recv().await {
        rest.push(event);
    }
    rest
}

pub async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition should hold before timeout");
}
