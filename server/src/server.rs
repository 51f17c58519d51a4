use std::net::{SocketAddr, ToSocketAddrs};

use futures::future::select;
use futures::pin_mut;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info};
use snafu::{OptionExt, ResultExt};
use tokio::sync::{mpsc, watch};
use warp::filters::ws::{Message, WebSocket};
use warp::Filter;

use deckmate_game::model::ClientId;
use deckmate_game::protocol::{Request, Response};

use crate::error::{self, Error};
use crate::requests;
use crate::settings;
use crate::state::{self, ClientHandle, Shared};

/// Execute the entire life-cycle of the relay server.
///
/// Serves the static client files, the liveness endpoint, and the
/// WebSocket relay until `shutdown_rx` fires, then drains every client
/// task before returning.
pub async fn run(
    server: settings::Server,
    relay: settings::Relay,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<Stats, Error> {
    // Channel to indicate that all client tasks have terminated.
    let (terminated_tx, mut terminated_rx) = mpsc::channel::<()>(1);

    // Create the global state.
    let (guard, weak_guard) = state::make_guard(shutdown_rx.clone(), terminated_tx);
    let shared = guard.shared();

    // Define our routes:

    // * Serve static client files
    let client_files = warp::get().and(warp::fs::dir(server.client_files_path.clone()));

    // * Liveness check
    let health = warp::path!("api" / "health").map(|| "OK");

    // * Accept websocket connections
    let response_capacity = relay.response_capacity;
    let websocket = warp::path("server")
        .and(warp::ws())
        .and(warp::addr::remote())
        .map(move |ws: warp::ws::Ws, addr: Option<SocketAddr>| {
            let handle = {
                let guard = weak_guard.upgrade().expect("server running");
                guard.new_client()
            };
            ws.on_upgrade(move |stream| async move {
                if let Some(addr) = addr {
                    info!("accepted connection from {}", addr);
                    handle_client(handle, stream, addr, response_capacity).await;
                } else {
                    error!("no address for incoming connection")
                }
            })
        });

    let routes = health.or(websocket).or(client_files);

    // Determine bind address
    let bind_addr = server
        .bind_addr
        .to_socket_addrs()
        .context(error::ResolveBindAddrSnafu {
            addr: server.bind_addr.clone(),
        })?
        .next()
        .context(error::NoBindAddrSnafu {
            addr: server.bind_addr.clone(),
        })?;

    // Start the server!
    let mut graceful_rx = shutdown_rx.clone();
    let (addr, serving) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(bind_addr, async move {
            graceful_rx.changed().await.ok();
            info!("received shutdown notice");
        })
        .context(error::BindSnafu { addr: bind_addr })?;
    info!("running on {}", addr);
    let web = tokio::spawn(async move {
        serving.await;
        info!("web server stopped");
    });

    // Wait for shutdown, then begin graceful termination.
    shutdown_rx.changed().await.ok();
    drop(guard);

    info!("waiting for client tasks to terminate");
    terminated_rx.recv().await;
    if let Err(e) = web.await {
        error!("web server task: {}", e);
    }

    Ok(Stats {
        total_accepted_connections: shared.total_accepted_connections(),
    })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stats {
    pub total_accepted_connections: usize,
}

// The limit of pending requests from a particular client.
const REQUEST_CAPACITY: usize = 2;

async fn handle_client(
    handle: ClientHandle,
    stream: WebSocket,
    addr: SocketAddr,
    response_capacity: usize,
) {
    // setup communication channels
    let (state, shutdown_rx, terminated_tx) = handle.split();
    let client_id = state.issue_client_id();
    state.record_connection();
    let (response_tx, response_rx) = mpsc::channel(response_capacity);
    let (request_tx, request_rx) = mpsc::channel(REQUEST_CAPACITY);
    // the new connection gets its identifier and the current snapshot
    requests::connect(&state, client_id, response_tx).await;
    // setup task loops
    let connection = process_connection(shutdown_rx.clone(), stream, addr, response_rx, request_tx);
    let request = handle_requests(state, shutdown_rx, client_id, addr, request_rx);
    pin_mut!(connection, request);
    // run task loops interleaved, and wait for both to finish.
    select(connection, request).await.factor_first().1.await;
    info!("finished handling {} (client {})", addr, client_id);
    // notify main task that we're done.
    drop(terminated_tx);
}

async fn process_connection(
    mut shutdown_rx: watch::Receiver<bool>,
    mut stream: WebSocket,
    addr: SocketAddr,
    mut response_rx: mpsc::Receiver<Response>,
    request_tx: mpsc::Sender<Request>,
) {
    debug!("starting connection processing loop for {}", addr);
    loop {
        tokio::select! {
            // Server shutting down
            _ = shutdown_rx.changed() => {
                break
            },
            // Write out response to socket
            Some(response) = response_rx.recv() =>
                send_response(&response, &mut stream, &addr).await,
            // Receive request from socket
            msg = stream.next() =>
                if forward_request(msg, &request_tx, &addr).await {
                    break;
                }
        }
    }
}

async fn send_response(response: &Response, stream: &mut WebSocket, addr: &SocketAddr) {
    match bincode::serialize(response) {
        Ok(data) => {
            if let Err(e) = stream.send(Message::binary(data)).await {
                error!("while sending response to {}: {}", addr, e);
            }
        }
        Err(e) => error!("while serializing response to {}: {}", addr, e),
    }
}

async fn forward_request(
    msg: Option<Result<Message, warp::Error>>,
    request_tx: &mpsc::Sender<Request>,
    addr: &SocketAddr,
) -> bool {
    let msg = match msg {
        Some(msg) => msg,
        None => return true,
    };
    match msg {
        Ok(msg) => {
            if msg.is_close() {
                return true;
            }
            let data = msg.into_bytes();
            if data.is_empty() {
                return false;
            }
            match bincode::deserialize(&data) {
                Ok(request) => {
                    if request_tx.send(request).await.is_err() {
                        return true;
                    }
                }
                Err(e) => error!("deserializing request from {}: {}", addr, e),
            }
        }
        Err(e) => error!("reading message from {}: {}", addr, e),
    }
    false
}

async fn handle_requests(
    state: Shared,
    mut shutdown_rx: watch::Receiver<bool>,
    client_id: ClientId,
    addr: SocketAddr,
    mut request_rx: mpsc::Receiver<Request>,
) {
    let mut hard_stop = false;

    debug!("starting request handling loop for {}", addr);
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("received notification to stop handling {}", addr);
                hard_stop = true;
                break;
            },
            opt_request = request_rx.recv() => match opt_request {
                Some(request) => requests::handle(&state, client_id, request).await,
                None => {
                    debug!("apparent death of sibling task for {}", addr);
                    break;
                },
            }
        }
    }

    if !(hard_stop || state.stopping()) {
        debug!("cleaning up {}", addr);
        requests::disconnect(&state, client_id).await;
    }
}
