//! Explicit per-join session state.
//!
//! A [`Session`] is built for one join target and dropped when the user
//! leaves or the connection closes. It owns the connection and the one
//! last-known snapshot, so nothing about a room outlives the session.

use blackjack::{
    Affordances, ClientAction, ParticipantId, Phase, RenderModel, Snapshot, reduce,
};
use log::{debug, info};
use tokio::sync::mpsc;

use crate::connection::{CloseReason, Connection, ConnectionError, ConnectionEvent, JoinTarget};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    InRoom { phase: Phase },
}

/// Last accepted snapshot and its render model. Both are replaced together
/// and never merged.
#[derive(Debug)]
pub struct RoomState {
    local: ParticipantId,
    current: Option<(Snapshot, RenderModel)>,
}

impl RoomState {
    pub fn new(local: ParticipantId) -> Self {
        Self {
            local,
            current: None,
        }
    }

    pub fn accept(&mut self, snapshot: Snapshot) -> &RenderModel {
        let model = reduce(&snapshot, &self.local);
        let (_, model) = self.current.insert((snapshot, model));
        model
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.current.as_ref().map(|(snapshot, _)| snapshot)
    }

    pub fn model(&self) -> Option<&RenderModel> {
        self.current.as_ref().map(|(_, model)| model)
    }

    /// Controls offered right now. Before the first snapshot arrives only
    /// adding a bot is possible.
    pub fn affordances(&self) -> Affordances {
        self.model()
            .map(|model| model.affordances)
            .unwrap_or(Affordances {
                add_bot: true,
                ..Default::default()
            })
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// What the UI should do after an event was applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionUpdate {
    Rendered,
    Ended(CloseReason),
}

/// How a session finished, as seen by the UI loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionEnd {
    Left,
    Quit,
    Closed(CloseReason),
}

pub struct Session {
    target: JoinTarget,
    connection: Option<Connection>,
    room: RoomState,
    state: SessionState,
}

impl Session {
    /// A disconnected session for `target`.
    pub fn new(target: JoinTarget) -> Self {
        Self {
            room: RoomState::new(target.name().clone()),
            target,
            connection: None,
            state: SessionState::Disconnected,
        }
    }

    /// Open the room's connection. The session is `Connecting` while the
    /// handshake runs, `InRoom` once it succeeds and `Disconnected` again if
    /// it fails. Any previous connection is dropped first.
    pub async fn connect(
        &mut self,
        base_url: &str,
    ) -> Result<mpsc::UnboundedReceiver<ConnectionEvent>, ConnectionError> {
        self.leave();
        self.state = SessionState::Connecting;
        debug!("Session state: {:?}", self.state);

        match Connection::open(base_url, &self.target).await {
            Ok((connection, events)) => {
                self.connection = Some(connection);
                self.state = SessionState::InRoom {
                    phase: Phase::NotStarted,
                };
                Ok(events)
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Build a session and connect it.
    pub async fn join(
        base_url: &str,
        target: JoinTarget,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ConnectionEvent>), ConnectionError> {
        let mut session = Self::new(target);
        let events = session.connect(base_url).await?;
        Ok((session, events))
    }

    pub fn target(&self) -> &JoinTarget {
        &self.target
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }

    /// Apply one connection event.
    pub fn handle(&mut self, event: ConnectionEvent) -> SessionUpdate {
        match event {
            ConnectionEvent::Snapshot(snapshot) => {
                let phase = self.room.accept(snapshot).phase.clone();
                if let SessionState::InRoom { phase: current } = &self.state
                    && current != &phase
                {
                    debug!("Hand phase changed to {phase:?}");
                }
                self.state = SessionState::InRoom { phase };
                SessionUpdate::Rendered
            }
            ConnectionEvent::Closed(reason) => {
                self.room.clear();
                self.state = SessionState::Disconnected;
                SessionUpdate::Ended(reason)
            }
        }
    }

    /// Forward an action if its control is currently offered. Returns
    /// whether it was forwarded.
    pub fn request(&self, action: ClientAction) -> bool {
        let Some(connection) = self.connection.as_ref().filter(|c| c.is_open()) else {
            return false;
        };
        if !self.room.affordances().allows(action) {
            debug!("{action} is not offered right now");
            return false;
        }
        connection.send_intent(action);
        true
    }

    /// Close the connection and discard everything known about the room.
    pub fn leave(&mut self) {
        if let SessionState::InRoom { .. } = self.state {
            info!("Leaving room {}", self.target.room());
        }
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.room.clear();
        self.state = SessionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackjack::{Card, HandValue, HandView, Notice, PlayerView, decode};

    fn dealer() -> HandView {
        HandView {
            hand: vec![Card::Hidden],
            value: HandValue::Unknown,
            bust: false,
        }
    }

    fn snapshot(phase: Phase, names: &[&str]) -> Snapshot {
        let players = names
            .iter()
            .map(|name| PlayerView {
                id: ParticipantId::new(name),
                hand: HandView {
                    hand: vec![],
                    value: HandValue::Known(12),
                    bust: false,
                },
                is_bot: false,
                stand: false,
            })
            .collect();
        Snapshot::new(phase, dealer(), players).unwrap()
    }

    #[test]
    fn test_accept_replaces_previous_snapshot() {
        let mut room = RoomState::new(ParticipantId::new("alice"));
        room.accept(snapshot(Phase::NotStarted, &["alice"]));
        room.accept(snapshot(
            Phase::InProgress {
                turn: Some(ParticipantId::new("alice")),
            },
            &["alice", "Bot1"],
        ));
        assert_eq!(room.snapshot().unwrap().players.len(), 2);
        let model = room.model().unwrap();
        assert_eq!(model.players.len(), 2);
        assert!(model.affordances.hit);
    }

    #[test]
    fn test_affordances_before_first_snapshot() {
        let room = RoomState::new(ParticipantId::new("alice"));
        let affordances = room.affordances();
        assert!(affordances.add_bot);
        assert!(!affordances.start);
        assert!(!affordances.hit);
    }

    #[test]
    fn test_rejected_frame_leaves_room_unchanged() {
        let mut room = RoomState::new(ParticipantId::new("alice"));
        room.accept(snapshot(Phase::NotStarted, &["alice"]));
        let before = room.model().cloned();

        for frame in [r#"{"type": "chat", "state": {}}"#, "garbage", r#"{"type": "state"}"#] {
            if let Ok(snapshot) = decode(frame) {
                room.accept(snapshot);
            }
        }

        assert_eq!(room.model().cloned(), before);
        assert_eq!(room.model().unwrap().notice, Notice::Waiting);
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let session = Session::new(JoinTarget::new("alice", "r1").unwrap());
        assert_eq!(session.state(), &SessionState::Disconnected);
        assert!(!session.is_connected());
        assert!(!session.request(ClientAction::AddBot));
        assert!(session.room().model().is_none());
    }

    #[test]
    fn test_clear_discards_snapshot() {
        let mut room = RoomState::new(ParticipantId::new("alice"));
        room.accept(snapshot(Phase::Over, &["alice"]));
        room.clear();
        assert!(room.snapshot().is_none());
        assert!(room.model().is_none());
    }
}
