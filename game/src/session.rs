//! The phase graph and every operation that mutates the shared aggregate:
//! join/leave bookkeeping with host assignment, order-card dealing, round
//! lifecycle, and scoring.
//!
//! Operations signal nothing: a dealing pass that runs out of cards simply
//! deals fewer, and score adjustments for an unknown player fall through.
//! Host gating happens in the mirror, which refuses to produce requests
//! for non-hosts; nothing downstream checks again.

use std::cmp::Ordering;

use rand::Rng;

use crate::deck;
use crate::model::{ClientId, GameState, Phase, Player};

impl GameState {
    /// Upsert a player by connection id.
    ///
    /// The first joiner into an empty roster becomes host and opens a
    /// fresh room (all other fields reset to defaults). A known id has
    /// its display name overwritten in place: a rejoin under a new name
    /// is still the same player.
    pub fn join(&mut self, id: ClientId, name: &str) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.name = name.into();
            return;
        }
        let first = self.players.is_empty();
        if first {
            *self = GameState::default();
        }
        let mut player = Player::new(id, name);
        player.is_host = first;
        self.players.push(player);
    }

    /// Remove a departing player. Returns false if the id was unknown.
    ///
    /// If the departed player was host and players remain, the first
    /// player in the remaining sequence inherits the host flag. An empty
    /// roster resets the whole aggregate to its defaults.
    pub fn leave(&mut self, id: ClientId) -> bool {
        let index = match self.players.iter().position(|p| p.id == id) {
            Some(index) => index,
            None => return false,
        };
        let was_host = self.players[index].is_host;
        self.players.remove(index);
        if self.players.is_empty() {
            *self = GameState::default();
        } else if was_host {
            self.players[0].is_host = true;
        }
        true
    }

    /// Deal order-cards and move the table into the order phase.
    pub fn start_game<R: Rng>(&mut self, rng: &mut R) {
        self.deal_order_cards(rng);
        self.phase = Phase::Order;
    }

    /// Deal one order-card to each player, in current player order, from a
    /// freshly built and shuffled deck. Callable repeatedly: every call
    /// discards the previous deck entirely and clears the retained copies
    /// from any earlier ordering.
    pub fn deal_order_cards<R: Rng>(&mut self, rng: &mut R) {
        let mut deck = deck::build_deck();
        deck::shuffle(&mut deck, rng);
        for player in self.players.iter_mut() {
            player.order_card = deck.pop();
            player.initial_order_card = None;
        }
        self.deck = deck;
    }

    /// Sort players by their order-cards, best card first, then retire
    /// each order-card into its retained copy and enter the playing phase.
    ///
    /// Players without an order-card compare as mutually equal, and the
    /// sort is stable, so invoking this a second time after the cards have
    /// already been cleared leaves the sequence unchanged. That quirk is
    /// deliberate and kept.
    pub fn finalize_order(&mut self) {
        self.players.sort_by(|a, b| match (&a.order_card, &b.order_card) {
            (Some(ca), Some(cb)) => deck::turn_priority(cb, ca),
            _ => Ordering::Equal,
        });
        for player in self.players.iter_mut() {
            player.initial_order_card = player.order_card.take();
        }
        self.phase = Phase::Playing;
    }

    /// Begin a round: fresh shuffled deck, every hand cleared, then two
    /// passes over the player sequence dealing one card each. The deal
    /// stops early, without complaint, if the deck runs out.
    pub fn start_new_round<R: Rng>(&mut self, rng: &mut R) {
        let mut deck = deck::build_deck();
        deck::shuffle(&mut deck, rng);
        for player in self.players.iter_mut() {
            player.hand.clear();
        }
        for _ in 0..2 {
            for player in self.players.iter_mut() {
                if let Some(card) = deck.pop() {
                    player.hand.push(card);
                }
            }
        }
        self.deck = deck;
        self.round_active = true;
        self.winner_name = None;
    }

    /// Credit the round to a player: +1 to their score, round closed,
    /// winner recorded. Hands stay on the table until an explicit
    /// `reset_round` or the next `start_new_round`.
    pub fn award_winner(&mut self, id: ClientId, name: &str) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.score += 1.0;
        }
        self.round_active = false;
        self.winner_name = Some(name.into());
    }

    /// Clear the table and the winner without dealing. Scores and roster
    /// are untouched.
    pub fn reset_round(&mut self) {
        for player in self.players.iter_mut() {
            player.hand.clear();
        }
        self.winner_name = None;
        self.round_active = false;
    }

    /// Adjust one player's score by an arbitrary delta (0.5 steps,
    /// corrections, or a negation to zero it out).
    pub fn update_score(&mut self, id: ClientId, delta: f64) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.score += delta;
        }
    }

    /// Reset the whole aggregate in place.
    pub fn reset(&mut self) {
        *self = GameState::default();
    }

    /// The player currently holding write authority, if any.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, Rank, Suit};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    fn table_of(names: &[&str]) -> GameState {
        let mut state = GameState::default();
        for (i, name) in names.iter().enumerate() {
            state.join(ClientId(i as u64), name);
        }
        state
    }

    #[test]
    fn first_joiner_becomes_host() {
        let state = table_of(&["alice", "bob"]);
        assert!(state.players[0].is_host);
        assert!(!state.players[1].is_host);
        assert_eq!(state.host().unwrap().name, "alice");
        assert_eq!(state.phase, Phase::Lobby);
    }

    #[test]
    fn rejoin_overwrites_the_name_in_place() {
        let mut state = table_of(&["alice", "bob"]);
        state.join(ClientId(0), "alicia");
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].name, "alicia");
        assert!(state.players[0].is_host);
    }

    #[test]
    fn host_transfers_to_the_next_player_in_join_order() {
        let mut state = table_of(&["alice", "bob", "carol"]);
        assert!(state.leave(ClientId(0)));
        assert_eq!(state.players.len(), 2);
        assert!(state.players[0].is_host);
        assert_eq!(state.players[0].name, "bob");
        assert!(!state.players[1].is_host);
    }

    #[test]
    fn leaving_an_unknown_id_changes_nothing() {
        let mut state = table_of(&["alice"]);
        assert!(!state.leave(ClientId(42)));
        assert_eq!(state.players.len(), 1);
    }

    #[test]
    fn empty_roster_resets_the_aggregate() {
        let mut state = table_of(&["alice", "bob"]);
        state.start_game(&mut rng());
        assert_eq!(state.phase, Phase::Order);
        state.leave(ClientId(1));
        state.leave(ClientId(0));
        assert_eq!(state, GameState::default());
    }

    #[test]
    fn start_game_deals_one_order_card_each() {
        let mut state = table_of(&["alice", "bob", "carol"]);
        state.start_game(&mut rng());
        assert_eq!(state.phase, Phase::Order);
        assert_eq!(state.deck.len(), 49);
        for player in &state.players {
            assert!(player.order_card.is_some());
            assert!(player.initial_order_card.is_none());
        }
        // Order cards and deck remainder partition one fresh deck.
        let mut ids: HashSet<String> = state.deck.iter().map(|c| c.id.clone()).collect();
        for player in &state.players {
            ids.insert(player.order_card.as_ref().unwrap().id.clone());
        }
        assert_eq!(ids.len(), 52);
    }

    #[test]
    fn order_cards_can_be_redealt_from_a_fresh_deck() {
        let mut state = table_of(&["alice", "bob"]);
        let mut rng = rng();
        state.start_game(&mut rng);
        state.deal_order_cards(&mut rng);
        assert_eq!(state.phase, Phase::Order);
        assert_eq!(state.deck.len(), 50);
        for player in &state.players {
            assert!(player.order_card.is_some());
            assert!(player.initial_order_card.is_none());
        }
    }

    #[test]
    fn finalize_order_sorts_best_card_first() {
        let mut state = table_of(&["alice", "bob", "carol"]);
        state.phase = Phase::Order;
        state.players[0].order_card = Some(Card::new(Suit::Hearts, Rank::Five));
        state.players[1].order_card = Some(Card::new(Suit::Spades, Rank::King));
        state.players[2].order_card = Some(Card::new(Suit::Diamonds, Rank::Five));
        state.finalize_order();

        let names: Vec<&str> = state.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bob", "carol", "alice"]);
        assert_eq!(state.phase, Phase::Playing);
        for player in &state.players {
            assert!(player.order_card.is_none());
            assert!(player.initial_order_card.is_some());
        }
        assert_eq!(
            state.players[0].initial_order_card.as_ref().unwrap().rank,
            Rank::King
        );
    }

    #[test]
    fn finalize_order_twice_keeps_the_sequence() {
        let mut state = table_of(&["alice", "bob"]);
        state.phase = Phase::Order;
        state.players[0].order_card = Some(Card::new(Suit::Clubs, Rank::Two));
        state.players[1].order_card = Some(Card::new(Suit::Clubs, Rank::Ten));
        state.finalize_order();
        let first: Vec<ClientId> = state.players.iter().map(|p| p.id).collect();
        state.finalize_order();
        let second: Vec<ClientId> = state.players.iter().map(|p| p.id).collect();
        assert_eq!(first, second);
        assert_eq!(state.phase, Phase::Playing);
    }

    #[test]
    fn a_round_deals_two_cards_per_player() {
        let mut state = table_of(&["alice", "bob", "carol"]);
        state.start_new_round(&mut rng());
        assert!(state.round_active);
        assert_eq!(state.winner_name, None);
        assert_eq!(state.deck.len(), 46);
        for player in &state.players {
            assert_eq!(player.hand.len(), 2);
        }
        // Every dealt card is distinct and drawn from one fresh deck.
        let mut ids: HashSet<String> = state.deck.iter().map(|c| c.id.clone()).collect();
        for player in &state.players {
            for card in &player.hand {
                ids.insert(card.id.clone());
            }
        }
        assert_eq!(ids.len(), 52);
    }

    #[test]
    fn an_exhausted_deck_deals_short_hands_silently() {
        let mut state = GameState::default();
        for i in 0..30 {
            state.join(ClientId(i), &format!("p{}", i));
        }
        state.start_new_round(&mut rng());
        assert!(state.deck.is_empty());
        let dealt: usize = state.players.iter().map(|p| p.hand.len()).sum();
        assert_eq!(dealt, 52);
        // First pass reaches everyone; the second runs out.
        assert!(state.players.iter().all(|p| !p.hand.is_empty()));
        assert!(state.players.iter().any(|p| p.hand.len() == 1));
        assert!(state.round_active);
    }

    #[test]
    fn awarding_a_winner_closes_the_round() {
        let mut state = table_of(&["alice", "bob"]);
        state.start_new_round(&mut rng());
        state.award_winner(ClientId(1), "bob");
        assert_eq!(state.players[1].score, 1.0);
        assert_eq!(state.players[0].score, 0.0);
        assert!(!state.round_active);
        assert_eq!(state.winner_name.as_deref(), Some("bob"));
        // Hands stay visible until the next deal or an explicit clear.
        assert_eq!(state.players[1].hand.len(), 2);
    }

    #[test]
    fn reset_round_clears_the_table_but_not_the_scores() {
        let mut state = table_of(&["alice", "bob"]);
        state.start_new_round(&mut rng());
        state.award_winner(ClientId(0), "alice");
        state.reset_round();
        assert!(state.players.iter().all(|p| p.hand.is_empty()));
        assert_eq!(state.winner_name, None);
        assert!(!state.round_active);
        assert_eq!(state.players[0].score, 1.0);
        assert_eq!(state.players.len(), 2);
    }

    #[test]
    fn scores_move_by_arbitrary_deltas() {
        let mut state = table_of(&["alice", "bob"]);
        state.update_score(ClientId(0), 0.5);
        state.update_score(ClientId(0), 1.0);
        assert_eq!(state.players[0].score, 1.5);
        // Zero it out by passing the negation.
        state.update_score(ClientId(0), -1.5);
        assert_eq!(state.players[0].score, 0.0);
        assert_eq!(state.players[1].score, 0.0);
        // Unknown ids fall through.
        state.update_score(ClientId(9), 3.0);
    }

    #[test]
    fn reset_restores_the_defaults() {
        let mut state = table_of(&["alice", "bob"]);
        let mut rng = rng();
        state.start_game(&mut rng);
        state.finalize_order();
        state.start_new_round(&mut rng);
        state.reset();
        assert_eq!(state, GameState::default());
    }
}
