//! # Blackjack
//!
//! Client-side core for a networked multiplayer blackjack table.
//!
//! The game server owns the deck, the turn order and the bots. It pushes a
//! complete [`Snapshot`] after every change. This library decodes those
//! snapshots at the boundary and reduces each one into a [`RenderModel`]:
//! the hands to draw, the controls the local participant may use, and the
//! per-player outcomes once the hand is over.
//!
//! ## Core Modules
//!
//! - [`entities`]: Snapshot schema, validated while decoding
//! - [`messages`]: Outbound actions and inbound frame decoding
//! - [`reducer`]: Affordance and outcome resolution
//! - [`avatar`]: Deterministic avatar selection
//!
//! ## Example
//!
//! ```
//! use blackjack::{ParticipantId, messages, reducer};
//!
//! let frame = r#"{"type": "state", "state": {
//!     "started": false, "over": false, "turn": null,
//!     "dealer": {"hand": [], "value": 0, "bust": false},
//!     "players": []
//! }}"#;
//! let snapshot = messages::decode(frame).unwrap();
//! let model = reducer::reduce(&snapshot, &ParticipantId::new("alice"));
//! assert!(model.affordances.start);
//! ```

pub mod avatar;
pub mod entities;
pub mod messages;
pub mod reducer;

pub use avatar::Avatar;
pub use entities::{
    Card, HandValue, HandView, ParticipantId, Phase, PlayerView, Rank, Snapshot, SnapshotError,
    Suit,
};
pub use messages::{ClientAction, DecodeError, decode};
pub use reducer::{
    Affordances, HandModel, LossReason, Notice, Outcome, PlayerModel, PlayerOutcome, RenderModel,
    Resolution, reduce, resolve_affordances, resolve_outcomes,
};
