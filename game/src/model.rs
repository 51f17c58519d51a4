use std::default::Default;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The four suits, weakest first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Clubs,
    Hearts,
    Diamonds,
}

/// Every suit, in ascending priority order.
pub const SUITS: [Suit; 4] = [Suit::Spades, Suit::Clubs, Suit::Hearts, Suit::Diamonds];

impl Suit {
    /// Priority weight, 1 (spades) through 4 (diamonds).
    pub fn value(self) -> u8 {
        match self {
            Suit::Spades => 1,
            Suit::Clubs => 2,
            Suit::Hearts => 3,
            Suit::Diamonds => 4,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Suit::Spades => "spades",
            Suit::Clubs => "clubs",
            Suit::Hearts => "hearts",
            Suit::Diamonds => "diamonds",
        })
    }
}

/// The thirteen ranks, Ace low and King high.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

/// Every rank, in ascending priority order.
pub const RANKS: [Rank; 13] = [
    Rank::Ace,
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
];

impl Rank {
    /// Priority weight, 1 (Ace) through 13 (King).
    pub fn value(self) -> u8 {
        self as u8 + 1
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        })
    }
}

/// A single playing card. Immutable once created.
///
/// The `value` and `suit_value` weights travel with the card in every
/// snapshot, so a mirrored card can be ranked without consulting the
/// tables above.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    /// Rank weight, 1..13, Ace low.
    pub value: u8,
    /// Suit weight, 1..4, diamonds high.
    pub suit_value: u8,
    /// Unique within one freshly built deck.
    pub id: String,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Card {
            suit,
            rank,
            value: rank.value(),
            suit_value: suit.value(),
            id: format!("{}-{}", rank, suit),
        }
    }
}

/// An opaque connection identifier, assigned by the relay transport.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One participant as recorded in the shared state.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Player {
    pub id: ClientId,
    /// Display name. Overwritten in place when the same connection rejoins.
    pub name: String,
    /// Adjusted in 0.5 / 1.0 / arbitrary correction increments.
    pub score: f64,
    /// At most two cards while a round is dealt.
    pub hand: Vec<Card>,
    /// Transient, held only while turn order is being determined.
    pub order_card: Option<Card>,
    /// Copy of the order-card, retained for display after it is cleared.
    pub initial_order_card: Option<Card>,
    pub is_host: bool,
}

impl Player {
    pub fn new(id: ClientId, name: &str) -> Self {
        Player {
            id,
            name: name.into(),
            score: 0.0,
            hand: Vec::new(),
            order_card: None,
            initial_order_card: None,
            is_host: false,
        }
    }
}

/// The shared phases. The client-local "setup" (name entry) view is never
/// part of a snapshot; see `client::LocalPhase`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Order,
    Playing,
}

/// The single shared aggregate. The host owns the authoritative copy;
/// everyone else mirrors it wholesale.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GameState {
    pub phase: Phase,
    /// Order is meaningful: the first player is the default host-transfer
    /// target when the host leaves.
    pub players: Vec<Player>,
    /// Cards left over from the most recent dealing operation.
    pub deck: Vec<Card>,
    pub round_active: bool,
    pub winner_name: Option<String>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            phase: Phase::Lobby,
            players: Vec::new(),
            deck: Vec::new(),
            round_active: false,
            winner_name: None,
        }
    }
}
