use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, error};
use tokio::sync::{mpsc, watch, Mutex, MutexGuard};

use deckmate_game::model::{ClientId, GameState};
use deckmate_game::protocol::Response;

/// The channel over which responses travel to one client's socket task.
pub type ResponseTx = mpsc::Sender<Response>;

/// The global state of the whole relay.
pub struct State {
    stopping: AtomicBool,
    next_client_id: AtomicU64,
    total_accepted_connections: AtomicUsize,
    synced: Mutex<Synced>,
}

impl State {
    fn new() -> Self {
        State {
            stopping: AtomicBool::new(false),
            next_client_id: AtomicU64::new(0),
            total_accepted_connections: AtomicUsize::new(0),
            synced: Mutex::new(Synced::new()),
        }
    }

    /// Wait for access to the synced state.
    ///
    /// Every inbound message is handled to completion under this lock, so
    /// no two mutations of the shared aggregate ever interleave.
    pub async fn lock(&self) -> MutexGuard<'_, Synced> {
        self.synced.lock().await
    }

    /// Inquire whether the server is in the process of shutting down.
    pub fn stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Hand out the connection identifier for a freshly accepted client.
    pub fn issue_client_id(&self) -> ClientId {
        ClientId(self.next_client_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn record_connection(&self) {
        self.total_accepted_connections
            .fetch_add(1, Ordering::Release);
    }

    pub fn total_accepted_connections(&self) -> usize {
        self.total_accepted_connections.load(Ordering::Acquire)
    }
}

/// A shared handle to the global relay state.
pub type Shared = Arc<State>;

/// The mutex-synchronized state: the single authoritative game aggregate
/// plus the response channel of every connected participant.
pub struct Synced {
    game: GameState,
    clients: HashMap<ClientId, ResponseTx>,
}

impl Synced {
    fn new() -> Self {
        Synced {
            game: GameState::default(),
            clients: HashMap::new(),
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn register_client(&mut self, id: ClientId, tx: ResponseTx) {
        self.clients.insert(id, tx);
    }

    pub fn remove_client(&mut self, id: ClientId) {
        self.clients.remove(&id);
    }

    /// Send to one connection only.
    pub async fn unicast(&self, id: ClientId, response: Response) {
        if let Some(tx) = self.clients.get(&id) {
            send(id, tx, response).await;
        }
    }

    /// Fan out to every connected participant.
    pub async fn broadcast(&self, response: Response) {
        for (&id, tx) in self.clients.iter() {
            send(id, tx, response.clone()).await;
        }
    }

    /// Fan out to everyone but the originator.
    pub async fn broadcast_except(&self, skip: ClientId, response: Response) {
        for (&id, tx) in self.clients.iter() {
            if id == skip {
                continue;
            }
            send(id, tx, response.clone()).await;
        }
    }
}

async fn send(id: ClientId, tx: &ResponseTx, response: Response) {
    if let Err(e) = tx.send(response).await {
        error!("while sending response to client {}: {}", id, e);
    }
}

/// Create a new, empty relay state, and return a guard for it.
pub fn make_guard(
    shutdown_rx: watch::Receiver<bool>,
    terminated_tx: mpsc::Sender<()>,
) -> (Arc<Guard>, Weak<Guard>) {
    let state = Arc::new(State::new());
    let guard = Guard {
        state,
        shutdown_rx,
        terminated_tx,
    };
    let guard = Arc::new(guard);
    let weak_guard = Arc::downgrade(&guard);
    (guard, weak_guard)
}

/// Ensures that client tasks receive notification of server shutdown.
///
/// The main server loop should be arranged so that no matter how it
/// exits, this guard gets dropped; dropping it flips the stopping flag
/// that keeps client tasks from broadcasting during teardown.
pub struct Guard {
    state: Shared,
    shutdown_rx: watch::Receiver<bool>,
    terminated_tx: mpsc::Sender<()>,
}

impl Guard {
    /// Create a handle for a new incoming client.
    pub fn new_client(&self) -> ClientHandle {
        ClientHandle {
            state: self.state.clone(),
            shutdown_rx: self.shutdown_rx.clone(),
            terminated_tx: self.terminated_tx.clone(),
        }
    }

    pub fn shared(&self) -> Shared {
        self.state.clone()
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        debug!("dropping guard");
        self.state.stopping.store(true, Ordering::Release);
    }
}

/// A handle to the state and shutdown notifications for new clients.
#[derive(Clone)]
pub struct ClientHandle {
    state: Shared,
    shutdown_rx: watch::Receiver<bool>,
    terminated_tx: mpsc::Sender<()>,
}

impl ClientHandle {
    /// Consume the handle to acquire its members.
    pub fn split(self) -> (Shared, watch::Receiver<bool>, mpsc::Sender<()>) {
        (self.state, self.shutdown_rx, self.terminated_tx)
    }
}
