//! Snapshot entities pushed by the game server.
//!
//! Every type here is validated while it is decoded. Raw wire shapes stay
//! private so the reducer only ever sees well-formed values.

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};
use thiserror::Error;

/// Participant name, used as the unique key within a room.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hearts => "♥",
            Self::Diamonds => "♦",
            Self::Clubs => "♣",
            Self::Spades => "♠",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
        };
        write!(f, "{repr}")
    }
}

/// Label the server uses for a face-down card's rank (and suit).
const HIDDEN_LABEL: &str = "Hidden";

#[derive(Deserialize)]
struct RawCard {
    rank: String,
    suit: String,
}

/// A dealt card. Face-down cards carry no rank or suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "RawCard")]
pub enum Card {
    Hidden,
    Face { rank: Rank, suit: Suit },
}

impl TryFrom<RawCard> for Card {
    type Error = SnapshotError;

    fn try_from(raw: RawCard) -> Result<Self, Self::Error> {
        if raw.rank == HIDDEN_LABEL {
            return Ok(Self::Hidden);
        }
        let rank = parse_label(&raw.rank).ok_or(SnapshotError::UnknownRank(raw.rank))?;
        let suit = parse_label(&raw.suit).ok_or(SnapshotError::UnknownSuit(raw.suit))?;
        Ok(Self::Face { rank, suit })
    }
}

/// Parse a bare wire label into one of the unit enums above.
fn parse_label<T: serde::de::DeserializeOwned>(label: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(label.to_string())).ok()
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Hidden => write!(f, "🂠"),
            Self::Face { rank, suit } => write!(f, "{rank}{suit}"),
        }
    }
}

/// Placeholder string for a value the server is concealing.
const UNKNOWN_VALUE: &str = "?";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(u8),
    Text(String),
}

/// Computed hand value, unknown while cards are concealed.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "RawValue")]
pub enum HandValue {
    Known(u8),
    Unknown,
}

impl HandValue {
    /// Numeric score used when comparing hands. Unknown counts as zero.
    pub fn score(&self) -> u8 {
        match self {
            Self::Known(value) => *value,
            Self::Unknown => 0,
        }
    }

    pub fn known(&self) -> Option<u8> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unknown => None,
        }
    }
}

impl TryFrom<RawValue> for HandValue {
    type Error = SnapshotError;

    fn try_from(raw: RawValue) -> Result<Self, Self::Error> {
        match raw {
            RawValue::Number(value) => Ok(Self::Known(value)),
            RawValue::Text(text) if text == UNKNOWN_VALUE => Ok(Self::Unknown),
            RawValue::Text(text) => Err(SnapshotError::InvalidValue(text)),
        }
    }
}

/// Cards and computed value of one hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct HandView {
    pub hand: Vec<Card>,
    pub value: HandValue,
    pub bust: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct PlayerView {
    #[serde(rename = "name")]
    pub id: ParticipantId,
    #[serde(flatten)]
    pub hand: HandView,
    pub is_bot: bool,
    pub stand: bool,
}

/// Lifecycle phase of a hand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    NotStarted,
    InProgress { turn: Option<ParticipantId> },
    Over,
}

#[derive(Deserialize)]
struct RawSnapshot {
    started: bool,
    over: bool,
    turn: Option<ParticipantId>,
    dealer: HandView,
    players: Vec<PlayerView>,
}

/// One authoritative view of the current hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "RawSnapshot")]
pub struct Snapshot {
    pub phase: Phase,
    pub dealer: HandView,
    /// Display order, as sent by the server.
    pub players: Vec<PlayerView>,
}

impl Snapshot {
    pub fn new(
        phase: Phase,
        dealer: HandView,
        players: Vec<PlayerView>,
    ) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(players.len());
        for player in &players {
            if !seen.insert(&player.id) {
                return Err(SnapshotError::DuplicateParticipant(player.id.clone()));
            }
        }
        Ok(Self {
            phase,
            dealer,
            players,
        })
    }

    pub fn player(&self, id: &ParticipantId) -> Option<&PlayerView> {
        self.players.iter().find(|player| &player.id == id)
    }

    /// Whose action is expected, if the hand is in progress.
    pub fn turn(&self) -> Option<&ParticipantId> {
        match &self.phase {
            Phase::InProgress { turn } => turn.as_ref(),
            _ => None,
        }
    }
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = SnapshotError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let phase = match (raw.started, raw.over) {
            (false, false) => Phase::NotStarted,
            (true, false) => Phase::InProgress { turn: raw.turn },
            (true, true) => Phase::Over,
            (false, true) => return Err(SnapshotError::UnreachablePhase),
        };
        Self::new(phase, raw.dealer, raw.players)
    }
}

/// Reasons a snapshot payload is refused at the boundary.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SnapshotError {
    #[error("Unknown card rank '{0}'")]
    UnknownRank(String),

    #[error("Unknown card suit '{0}'")]
    UnknownSuit(String),

    #[error("Invalid hand value '{0}'")]
    InvalidValue(String),

    #[error("Snapshot is over but was never started")]
    UnreachablePhase,

    #[error("Participant '{0}' appears more than once")]
    DuplicateParticipant(ParticipantId),
}
