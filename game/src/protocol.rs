use std::convert::From;

use serde::{Deserialize, Serialize};

use crate::model::{ClientId, GameState};

/// Every possible kind of request that a participant may send.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum Request {
    /// Enter (or rejoin) the shared roster under a display name.
    Join(JoinRequest),
    /// Push a complete replacement of the shared state. The relay applies
    /// this from any connection; the host gate is client-side only, so
    /// the protocol itself trusts the sender.
    ReplaceState(ReplaceStateRequest),
    /// Operator-initiated full reset of the whole session.
    Reset,
}

/// Every possible kind of message that the relay may send.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum Response {
    /// Unicast to a freshly accepted connection: the identifier the relay
    /// assigned to it, together with the current snapshot.
    Hello(HelloResponse),
    /// The full shared state, broadcast after every mutation.
    Snapshot(SnapshotResponse),
    /// Tells every mirror to drop its cached identity and return to name
    /// entry. Always followed by a fresh default snapshot.
    ResetNotice,
}

// Auxillary macro for converting inner request/response types into their
// outermost counterparts.

macro_rules! derive_from {
    ($to:ident, $ty:ident, $r:ident) => {
        impl From<$r> for $to {
            fn from(r: $r) -> Self {
                $to::$ty(r)
            }
        }
    };
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct JoinRequest {
    pub name: String,
}

derive_from!(Request, Join, JoinRequest);

/// The whole aggregate, computed host-side. There are no deltas: every
/// state-changing exchange carries the entire `GameState`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReplaceStateRequest {
    pub state: GameState,
}

derive_from!(Request, ReplaceState, ReplaceStateRequest);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HelloResponse {
    pub client_id: ClientId,
    pub state: GameState,
}

derive_from!(Response, Hello, HelloResponse);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SnapshotResponse {
    pub state: GameState,
}

derive_from!(Response, Snapshot, SnapshotResponse);
