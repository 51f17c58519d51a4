//! The card engine: deck construction, shuffling, and turn-priority
//! comparison. Pure and stateless; randomness is always injected so that
//! shuffles are reproducible under test.

use std::cmp::Ordering;

use rand::Rng;

use crate::model::{Card, RANKS, SUITS};

/// Build a full, ordered 52-card deck.
///
/// Suits run [spades, clubs, hearts, diamonds] and within each suit the
/// ranks run [Ace..King], so the ordering is deterministic before any
/// shuffle.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for &suit in SUITS.iter() {
        for &rank in RANKS.iter() {
            deck.push(Card::new(suit, rank));
        }
    }
    deck
}

/// Shuffle the deck in place with a single Fisher-Yates pass, from the
/// last index down to 1, swapping each position with a uniformly chosen
/// earlier-or-equal one. Preserves the exact multiset of cards.
pub fn shuffle<R: Rng>(deck: &mut [Card], rng: &mut R) {
    for i in (1..deck.len()).rev() {
        let j = rng.gen_range(0..=i);
        deck.swap(i, j);
    }
}

/// Total turn-priority ordering between two cards: higher rank wins, and
/// on a rank tie the higher suit wins (diamonds > hearts > clubs >
/// spades). `Greater` means `a` takes its turn before `b`; identical
/// weights compare `Equal` (no preference).
pub fn turn_priority(a: &Card, b: &Card) -> Ordering {
    (a.value, a.suit_value).cmp(&(b.value, b.suit_value))
}
