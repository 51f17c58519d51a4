//! Per-message relay logic: what happens when a connection arrives, sends
//! a request, or goes away. Everything runs to completion under the state
//! lock, and every state-changing exchange transmits the full aggregate.

use log::{debug, info};

use deckmate_game::model::ClientId;
use deckmate_game::protocol::{HelloResponse, Request, Response, SnapshotResponse};

use crate::state::{ResponseTx, Shared, Synced};

/// A connection was accepted: remember its channel and unicast the current
/// snapshot, along with the identifier we assigned it, to it alone.
pub async fn connect(state: &Shared, id: ClientId, tx: ResponseTx) {
    let mut synced = state.lock().await;
    synced.register_client(id, tx);
    let hello = HelloResponse {
        client_id: id,
        state: synced.game().clone(),
    };
    synced.unicast(id, hello.into()).await;
}

/// Execute one request from a connected client.
pub async fn handle(state: &Shared, id: ClientId, request: Request) {
    let mut synced = state.lock().await;
    match request {
        Request::Join(join) => {
            info!("client {} joins as {:?}", id, join.name);
            synced.game_mut().join(id, &join.name);
            let snapshot = snapshot(&synced);
            synced.broadcast(snapshot).await;
        }
        Request::ReplaceState(replace) => {
            // Applied from any connection, not just the recorded host.
            // The sender's identity is known here, but is deliberately not
            // checked: the last replacement written wins. Host gating
            // lives client-side, in the mirror.
            debug!("client {} replaces the shared state", id);
            *synced.game_mut() = replace.state;
            let snapshot = snapshot(&synced);
            synced.broadcast_except(id, snapshot).await;
        }
        Request::Reset => {
            info!("full reset requested by client {}", id);
            synced.game_mut().reset();
            synced.broadcast(Response::ResetNotice).await;
            let snapshot = snapshot(&synced);
            synced.broadcast(snapshot).await;
        }
    }
}

/// A connection went away: forget its channel, apply the leave rule, and
/// let the remaining participants see the reduced roster.
pub async fn disconnect(state: &Shared, id: ClientId) {
    let mut synced = state.lock().await;
    synced.remove_client(id);
    if synced.game_mut().leave(id) {
        info!("client {} left; {} remain", id, synced.game().players.len());
        let snapshot = snapshot(&synced);
        synced.broadcast(snapshot).await;
    }
}

fn snapshot(synced: &Synced) -> Response {
    SnapshotResponse {
        state: synced.game().clone(),
    }
    .into()
}
