//! The client mirror: each participant's local reflection of the shared
//! state. It replaces itself wholesale on every received snapshot, heals a
//! dropped join on its own, and, when its player holds the host flag,
//! computes new authoritative states to push back through the relay.

use log::debug;
use rand::Rng;

use crate::model::{ClientId, GameState, Phase, Player};
use crate::protocol::{JoinRequest, ReplaceStateRequest, Request, Response};

/// Which view the participant sees locally. `Setup` (name entry) exists
/// only here; it is never part of the shared snapshot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LocalPhase {
    Setup,
    Shared(Phase),
}

/// A participant's mirrored view of the session.
///
/// Reconciliation is deliberately blunt: the last snapshot delivered wins,
/// with no merge, no per-field diff, and no sequence check. The transport
/// must deliver messages in order per connection.
#[derive(Debug, Default)]
pub struct Mirror {
    client_id: Option<ClientId>,
    /// The display name persisted across reloads, client-local only.
    cached_name: Option<String>,
    state: GameState,
}

impl Mirror {
    /// Create a mirror, seeding it with a display name restored from
    /// client-local storage, if there was one.
    pub fn new(cached_name: Option<String>) -> Self {
        Mirror {
            client_id: None,
            cached_name,
            state: GameState::default(),
        }
    }

    /// Digest one message from the relay. May hand back a request that
    /// should be transmitted in response (the self-healing rejoin).
    pub fn handle_response(&mut self, response: Response) -> Option<Request> {
        match response {
            Response::Hello(hello) => {
                self.client_id = Some(hello.client_id);
                self.state = hello.state;
                // The connection just stabilized; if a name survived the
                // reload, rejoin with it immediately.
                self.cached_name
                    .clone()
                    .map(|name| JoinRequest { name }.into())
            }
            Response::Snapshot(snapshot) => {
                self.state = snapshot.state;
                self.ghost_rejoin()
            }
            Response::ResetNotice => {
                self.cached_name = None;
                self.state = GameState::default();
                None
            }
        }
    }

    // A join can be lost in transit, or issued before the connection
    // identifier stabilized. If we carry a name but the lobby roster does
    // not know us, quietly ask again.
    fn ghost_rejoin(&self) -> Option<Request> {
        let name = self.cached_name.as_ref()?;
        if self.state.phase != Phase::Lobby {
            return None;
        }
        let present = self
            .state
            .players
            .iter()
            .any(|p| Some(p.id) == self.client_id || &p.name == name);
        if present {
            None
        } else {
            debug!("name {:?} missing from lobby roster; rejoining", name);
            Some(JoinRequest { name: name.clone() }.into())
        }
    }

    /// Cache the chosen display name and produce the join request.
    pub fn join(&mut self, name: &str) -> Request {
        self.cached_name = Some(name.into());
        JoinRequest { name: name.into() }.into()
    }

    /// Forget the cached identity, e.g. when the participant walks away.
    pub fn forget_name(&mut self) {
        self.cached_name = None;
    }

    /// Ask the relay for a full session reset. Drops the cached name right
    /// away; the reset notice will do the same for everyone else.
    pub fn request_reset(&mut self) -> Request {
        self.cached_name = None;
        Request::Reset
    }

    // --- Host actions ---
    //
    // Each one is a silent no-op unless this mirror's player currently
    // holds the host flag. Otherwise the operation is applied to the local
    // state and the resulting full replacement is handed back for
    // transmission.

    pub fn start_game<R: Rng>(&mut self, rng: &mut R) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.start_game(rng);
        Some(self.replace_state())
    }

    pub fn deal_order_cards<R: Rng>(&mut self, rng: &mut R) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.deal_order_cards(rng);
        Some(self.replace_state())
    }

    pub fn finalize_order(&mut self) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.finalize_order();
        Some(self.replace_state())
    }

    pub fn start_new_round<R: Rng>(&mut self, rng: &mut R) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.start_new_round(rng);
        Some(self.replace_state())
    }

    pub fn award_winner(&mut self, id: ClientId, name: &str) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.award_winner(id, name);
        Some(self.replace_state())
    }

    pub fn reset_round(&mut self) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.reset_round();
        Some(self.replace_state())
    }

    pub fn update_score(&mut self, id: ClientId, delta: f64) -> Option<Request> {
        if !self.is_host() {
            return None;
        }
        self.state.update_score(id, delta);
        Some(self.replace_state())
    }

    fn replace_state(&self) -> Request {
        ReplaceStateRequest {
            state: self.state.clone(),
        }
        .into()
    }

    // --- Accessors ---

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.cached_name.as_deref()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> LocalPhase {
        if self.cached_name.is_none() {
            LocalPhase::Setup
        } else {
            LocalPhase::Shared(self.state.phase)
        }
    }

    pub fn me(&self) -> Option<&Player> {
        let id = self.client_id?;
        self.state.player(id)
    }

    pub fn is_host(&self) -> bool {
        self.me().map(|p| p.is_host).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HelloResponse, SnapshotResponse};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    fn roster(names: &[&str]) -> GameState {
        let mut state = GameState::default();
        for (i, name) in names.iter().enumerate() {
            state.join(ClientId(i as u64), name);
        }
        state
    }

    fn hello(mirror: &mut Mirror, id: u64, state: GameState) -> Option<Request> {
        mirror.handle_response(
            HelloResponse {
                client_id: ClientId(id),
                state,
            }
            .into(),
        )
    }

    #[test]
    fn snapshots_replace_the_whole_view() {
        let mut mirror = Mirror::new(None);
        hello(&mut mirror, 0, roster(&["alice"]));
        let next = roster(&["alice", "bob"]);
        let req = mirror.handle_response(SnapshotResponse { state: next.clone() }.into());
        assert_eq!(req, None);
        assert_eq!(mirror.state(), &next);
    }

    #[test]
    fn hello_records_the_id_and_rejoins_with_a_cached_name() {
        let mut mirror = Mirror::new(Some("alice".into()));
        let req = hello(&mut mirror, 7, GameState::default());
        assert_eq!(mirror.client_id(), Some(ClientId(7)));
        assert_eq!(
            req,
            Some(JoinRequest {
                name: "alice".into()
            }
            .into())
        );
    }

    #[test]
    fn a_ghost_in_the_lobby_rejoins_itself() {
        let mut mirror = Mirror::new(None);
        hello(&mut mirror, 9, GameState::default());
        mirror.join("carol");
        // Roster that knows neither our id nor our name.
        let req = mirror.handle_response(
            SnapshotResponse {
                state: roster(&["alice", "bob"]),
            }
            .into(),
        );
        assert_eq!(
            req,
            Some(JoinRequest {
                name: "carol".into()
            }
            .into())
        );
    }

    #[test]
    fn no_rejoin_once_present_or_outside_the_lobby() {
        let mut mirror = Mirror::new(None);
        hello(&mut mirror, 1, GameState::default());
        mirror.join("bob");
        // Present by id: nothing to heal.
        assert_eq!(
            mirror.handle_response(
                SnapshotResponse {
                    state: roster(&["alice", "bob"]),
                }
                .into()
            ),
            None
        );
        // Missing, but the game has moved on; stay put.
        let mut playing = roster(&["alice"]);
        playing.phase = Phase::Playing;
        assert_eq!(
            mirror.handle_response(SnapshotResponse { state: playing }.into()),
            None
        );
    }

    #[test]
    fn forgetting_the_name_returns_to_setup_without_touching_the_state() {
        let mut mirror = Mirror::new(None);
        hello(&mut mirror, 0, roster(&["alice", "bob"]));
        mirror.join("alice");
        assert_eq!(mirror.phase(), LocalPhase::Shared(Phase::Lobby));
        mirror.forget_name();
        assert_eq!(mirror.display_name(), None);
        assert_eq!(mirror.phase(), LocalPhase::Setup);
        // Only the local identity is dropped; the mirrored state and the
        // connection identifier stay as they were.
        assert_eq!(mirror.state(), &roster(&["alice", "bob"]));
        assert_eq!(mirror.client_id(), Some(ClientId(0)));
    }

    #[test]
    fn reset_notice_drops_the_cached_identity() {
        let mut mirror = Mirror::new(None);
        hello(&mut mirror, 0, roster(&["alice"]));
        mirror.join("alice");
        assert_eq!(mirror.phase(), LocalPhase::Shared(Phase::Lobby));
        let req = mirror.handle_response(Response::ResetNotice);
        assert_eq!(req, None);
        assert_eq!(mirror.display_name(), None);
        assert_eq!(mirror.phase(), LocalPhase::Setup);
        assert_eq!(mirror.state(), &GameState::default());
    }

    #[test]
    fn host_actions_are_silent_no_ops_for_non_hosts() {
        let mut mirror = Mirror::new(None);
        // id 1 is bob, who is not host.
        hello(&mut mirror, 1, roster(&["alice", "bob"]));
        assert!(!mirror.is_host());
        assert_eq!(mirror.start_game(&mut rng()), None);
        assert_eq!(mirror.finalize_order(), None);
        assert_eq!(mirror.start_new_round(&mut rng()), None);
        assert_eq!(mirror.award_winner(ClientId(1), "bob"), None);
        assert_eq!(mirror.reset_round(), None);
        assert_eq!(mirror.update_score(ClientId(1), 0.5), None);
    }

    #[test]
    fn the_host_computes_and_pushes_the_new_state() {
        let mut mirror = Mirror::new(None);
        hello(&mut mirror, 0, roster(&["alice", "bob"]));
        assert!(mirror.is_host());
        let req = mirror.start_game(&mut rng()).expect("host action");
        match req {
            Request::ReplaceState(replace) => {
                assert_eq!(replace.state.phase, Phase::Order);
                assert!(replace.state.players.iter().all(|p| p.order_card.is_some()));
                // The local view advanced in lockstep.
                assert_eq!(&replace.state, mirror.state());
            }
            other => panic!("expected a state replacement, got {:?}", other),
        }
    }
}
