//! Wire messages exchanged with the game server.
//!
//! Outbound frames are single-field JSON objects naming an action. Inbound
//! frames carry a `type` tag; only `state` frames are understood and every
//! other frame is refused with a [`DecodeError`] that callers drop.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::entities::Snapshot;

/// Tag of the only inbound frame type this client understands.
const STATE_TYPE: &str = "state";

/// An intent forwarded to the server.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    AddBot,
    Start,
    Hit,
    Stand,
}

impl fmt::Display for ClientAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::AddBot => "add bot",
            Self::Start => "start",
            Self::Hit => "hit",
            Self::Stand => "stand",
        };
        write!(f, "{repr}")
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    state: Option<serde_json::Value>,
}

/// Reasons an inbound frame is dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unrecognized message type '{0}'")]
    UnknownType(String),

    #[error("State frame without a state payload")]
    MissingState,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),
}

/// Decode one inbound text frame into a validated snapshot.
pub fn decode(text: &str) -> Result<Snapshot, DecodeError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
    if envelope.kind != STATE_TYPE {
        return Err(DecodeError::UnknownType(envelope.kind));
    }
    let state = envelope.state.ok_or(DecodeError::MissingState)?;
    let snapshot: Snapshot =
        serde_json::from_value(state).map_err(DecodeError::InvalidSnapshot)?;
    debug!(
        "decoded snapshot with {} player(s), phase {:?}",
        snapshot.players.len(),
        snapshot.phase
    );
    Ok(snapshot)
}
