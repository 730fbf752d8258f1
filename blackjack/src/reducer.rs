//! Pure mapping from a snapshot to what the client shows.
//!
//! [`reduce`] is evaluated fresh for every snapshot. It decides which
//! controls are available to the local participant and, once the hand is
//! over, how each player fared against the dealer. Nothing here is
//! authoritative: the server still rejects out-of-turn actions on its own,
//! and the outcomes restate what the snapshot already encodes.

use std::fmt;

use crate::{
    avatar::Avatar,
    entities::{Card, HandView, ParticipantId, Phase, Snapshot},
    messages::ClientAction,
};

/// Which action controls are currently offered.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Affordances {
    pub add_bot: bool,
    pub start: bool,
    pub hit: bool,
    pub stand: bool,
}

impl Affordances {
    pub fn allows(&self, action: ClientAction) -> bool {
        match action {
            ClientAction::AddBot => self.add_bot,
            ClientAction::Start => self.start,
            ClientAction::Hit => self.hit,
            ClientAction::Stand => self.stand,
        }
    }

    /// Enabled actions in display order.
    pub fn enabled(&self) -> Vec<ClientAction> {
        [
            ClientAction::AddBot,
            ClientAction::Start,
            ClientAction::Hit,
            ClientAction::Stand,
        ]
        .into_iter()
        .filter(|action| self.allows(*action))
        .collect()
    }
}

pub fn resolve_affordances(snapshot: &Snapshot, local: &ParticipantId) -> Affordances {
    match &snapshot.phase {
        Phase::NotStarted | Phase::Over => Affordances {
            add_bot: true,
            start: true,
            hit: false,
            stand: false,
        },
        Phase::InProgress { turn } => {
            let can_act = turn.as_ref() == Some(local)
                && snapshot
                    .player(local)
                    .is_some_and(|me| !me.stand && !me.hand.bust);
            Affordances {
                add_bot: true,
                start: false,
                hit: can_act,
                stand: can_act,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LossReason {
    PlayerBust,
    LowerScore,
}

/// A player's result for a completed hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    PlayerWins,
    Push,
    DealerWins(LossReason),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::PlayerWins => "🎉 You win!",
            Self::Push => "🤝 Push (tie).",
            Self::DealerWins(LossReason::PlayerBust) => "BUST! Dealer wins.",
            Self::DealerWins(LossReason::LowerScore) => "Dealer wins.",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerOutcome {
    pub id: ParticipantId,
    pub avatar: Avatar,
    pub outcome: Outcome,
}

impl fmt::Display for PlayerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}: {}", self.avatar, self.id, self.outcome)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Resolution {
    /// One entry per player, in snapshot order.
    pub outcomes: Vec<PlayerOutcome>,
    /// Highest-scoring winner; the first in snapshot order on a tie.
    pub celebrated: Option<ParticipantId>,
}

impl Resolution {
    pub fn outcome_of(&self, id: &ParticipantId) -> Option<Outcome> {
        self.outcomes
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| entry.outcome)
    }
}

/// Settle every player against the dealer. Only meaningful once the hand is
/// over; callers are expected to check the phase.
pub fn resolve_outcomes(snapshot: &Snapshot) -> Resolution {
    let dealer_score = snapshot.dealer.value.score();
    let dealer_bust = snapshot.dealer.bust;

    let mut resolution = Resolution::default();
    // A winner has to beat this to be celebrated, so a zero score never is.
    let mut best = 0;
    for player in &snapshot.players {
        let score = player.hand.value.score();
        let outcome = if player.hand.bust {
            Outcome::DealerWins(LossReason::PlayerBust)
        } else if dealer_bust || score > dealer_score {
            Outcome::PlayerWins
        } else if score == dealer_score {
            Outcome::Push
        } else {
            Outcome::DealerWins(LossReason::LowerScore)
        };

        if outcome == Outcome::PlayerWins && score > best {
            best = score;
            resolution.celebrated = Some(player.id.clone());
        }

        resolution.outcomes.push(PlayerOutcome {
            id: player.id.clone(),
            avatar: Avatar::for_name(player.id.as_str()),
            outcome,
        });
    }
    resolution
}

/// Message shown below the table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    Waiting,
    Results(Resolution),
    None,
}

impl Notice {
    pub const WAITING_TEXT: &'static str =
        "Waiting for players... Add friends or bots and start the game!";
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandModel {
    pub avatar: Avatar,
    pub cards: Vec<Card>,
    /// Absent while the value is concealed.
    pub score: Option<u8>,
    pub bust: bool,
}

impl HandModel {
    fn new(avatar: Avatar, hand: &HandView) -> Self {
        Self {
            avatar,
            cards: hand.hand.clone(),
            score: hand.value.known(),
            bust: hand.bust,
        }
    }

    pub fn cards_repr(&self) -> String {
        self.cards
            .iter()
            .map(Card::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerModel {
    pub id: ParticipantId,
    pub hand: HandModel,
    pub is_bot: bool,
    pub stand: bool,
    pub is_turn: bool,
    pub is_local: bool,
}

/// Everything needed to draw one snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderModel {
    pub phase: Phase,
    pub dealer: HandModel,
    pub players: Vec<PlayerModel>,
    pub affordances: Affordances,
    pub notice: Notice,
}

pub fn reduce(snapshot: &Snapshot, local: &ParticipantId) -> RenderModel {
    let turn = snapshot.turn();
    let players = snapshot
        .players
        .iter()
        .map(|player| PlayerModel {
            id: player.id.clone(),
            hand: HandModel::new(Avatar::for_name(player.id.as_str()), &player.hand),
            is_bot: player.is_bot,
            stand: player.stand,
            is_turn: turn == Some(&player.id),
            is_local: &player.id == local,
        })
        .collect();

    let notice = match snapshot.phase {
        Phase::NotStarted => Notice::Waiting,
        Phase::Over => Notice::Results(resolve_outcomes(snapshot)),
        Phase::InProgress { .. } => Notice::None,
    };

    RenderModel {
        phase: snapshot.phase.clone(),
        dealer: HandModel::new(Avatar::Dealer, &snapshot.dealer),
        players,
        affordances: resolve_affordances(snapshot, local),
        notice,
    }
}
