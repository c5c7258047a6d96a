//! TCP server exposing a [`RunCoordinator`] to remote controllers.
//!
//! Each connection is served by its own task and handles one request at a
//! time, in order. A controller therefore keeps `StartRun` on a dedicated
//! connection and sends side-channel calls on another.
//!
//! While a `StartRun` is in flight the connection keeps reading: further
//! lines are queued until the run returns, and if the peer hangs up the run
//! is asked to quit so the coordinator is not left owned by a dead client.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::coordinator::RunCoordinator;
use crate::rpc::codec::LineCodec;
use crate::rpc::protocol::{
    KeyCommandResponse, KeyCommandRequest, Request, Response, StartRunRequest, StartRunResponse,
};
use crate::{AppError, Result};

/// Bind the listening socket.
///
/// # Errors
///
/// Returns `AppError::Transport` if the address cannot be bound.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Transport(format!("failed to bind {addr}: {err}")))?;
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "server listening");
    }
    Ok(listener)
}

/// Spawn the accept loop. It stops when `ct` is cancelled.
pub fn spawn_server(
    listener: TcpListener,
    coordinator: Arc<RunCoordinator>,
    ct: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("server shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok((stream, peer)) => {
                                let coordinator = Arc::clone(&coordinator);
                                tokio::spawn(handle_connection(stream, peer, coordinator));
                            }
                            Err(err) => {
                                warn!(%err, "accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(info_span!("rpc_server")),
    )
}

/// Serve a single controller connection until it closes.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, coordinator: Arc<RunCoordinator>) {
    let span = info_span!("rpc_conn", %peer);
    async move {
        info!("connection opened");
        let (reader, writer) = stream.into_split();
        let mut lines = FramedRead::new(reader, LineCodec::new());
        let mut sink = FramedWrite::new(writer, LineCodec::new());
        let mut queued: VecDeque<String> = VecDeque::new();

        loop {
            let line = match queued.pop_front() {
                Some(line) => line,
                None => match lines.next().await {
                    Some(Ok(line)) => line,
                    Some(Err(err)) => {
                        warn!(%err, "read error");
                        break;
                    }
                    None => break,
                },
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(trimmed) {
                Ok(Request::StartRun(body)) => {
                    match serve_start_run(body, &coordinator, &mut lines, &mut queued).await {
                        Some(response) => response,
                        None => {
                            info!("peer left during run");
                            return;
                        }
                    }
                }
                Ok(request) => dispatch(&request, &coordinator),
                Err(err) => {
                    debug!(%err, "rejecting malformed request");
                    Response::failure(&AppError::from(err))
                }
            };

            let response_line = serde_json::to_string(&response).unwrap_or_else(|_| {
                r#"{"ok":false,"kind":"protocol","error":"serialization failed"}"#.to_owned()
            });
            if let Err(err) = sink.send(response_line).await {
                warn!(%err, "failed to write response");
                break;
            }
        }

        info!("connection closed");
    }
    .instrument(span)
    .await;
}

/// Run `StartRun` while watching the connection.
///
/// Returns `None` if the peer disconnected, in which case nobody is left to
/// read the response.
async fn serve_start_run(
    body: StartRunRequest,
    coordinator: &RunCoordinator,
    lines: &mut FramedRead<tokio::net::tcp::OwnedReadHalf, LineCodec>,
    queued: &mut VecDeque<String>,
) -> Option<Response> {
    let StartRunRequest { grid, params } = body;
    let run = coordinator.start(grid, params);
    tokio::pin!(run);
    let mut peer_gone = false;

    let result = loop {
        tokio::select! {
            // The run is polled first so a rejected start returns before the
            // connection is inspected; a hang-up must only ever quit our run.
            biased;
            result = &mut run => break result,
            frame = lines.next(), if !peer_gone => match frame {
                Some(Ok(line)) => queued.push_back(line),
                Some(Err(_)) | None => {
                    peer_gone = true;
                    warn!("connection closed during run, requesting quit");
                    coordinator.request_quit();
                }
            },
        }
    };

    if peer_gone {
        if let Err(err) = result {
            warn!(%err, "abandoned run failed");
        }
        return None;
    }

    Some(match result {
        Ok(snapshot) => Response::from_payload(&StartRunResponse::from(snapshot)),
        Err(err) => {
            warn!(%err, "start run rejected");
            Response::failure(&err)
        }
    })
}

/// Route a side-channel request to the coordinator.
fn dispatch(request: &Request, coordinator: &RunCoordinator) -> Response {
    let span = info_span!("rpc_request", method = request.method());
    let _guard = span.enter();

    match request {
        Request::PollProgress(_) => Response::from_payload(&coordinator.poll()),
        Request::KeyCommand(KeyCommandRequest { command }) => {
            debug!(command = command.as_str(), "key command");
            let reply = coordinator.handle(*command);
            Response::from_payload(&KeyCommandResponse::from(reply))
        }
        Request::StartRun(_) => Response::failure(&AppError::Protocol(
            "StartRun must be served on its own".into(),
        )),
    }
}
