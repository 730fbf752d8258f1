//! Integration tests for the room connection and session.
//!
//! Each test starts an in-process WebSocket room that plays back a script of
//! frames and reports everything the client sends.

use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use bj_client::{
    connection::{Connection, ConnectionError, ConnectionEvent, JoinError, JoinTarget},
    input::InputLines,
    session::{Session, SessionEnd, SessionState, SessionUpdate},
    text_client,
};
use blackjack::{ClientAction, Phase};
use serde_json::{Value, json};
use std::{
    io::{self, BufReader, Read},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc as std_mpsc,
    },
    time::Duration,
};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};

const WAIT: Duration = Duration::from_secs(5);
const CLOSED_MARKER: &str = "<closed>";

// ============================================================================
// Mock Room
// ============================================================================

#[derive(Debug)]
struct Received {
    room: String,
    name: String,
    text: String,
}

#[derive(Clone)]
struct MockRoom {
    script: Arc<Vec<String>>,
    close_after_script: bool,
    connections: Arc<AtomicUsize>,
    received: mpsc::UnboundedSender<Received>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room, name)): Path<(String, String)>,
    State(mock): State<MockRoom>,
) -> impl IntoResponse {
    mock.connections.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| serve(socket, room, name, mock))
}

async fn serve(mut socket: WebSocket, room: String, name: String, mock: MockRoom) {
    for frame in mock.script.iter() {
        if socket.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }
    if mock.close_after_script {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let _ = mock.received.send(Received {
                    room: room.clone(),
                    name: name.clone(),
                    text: text.as_str().to_string(),
                });
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    let _ = mock.received.send(Received {
        room,
        name,
        text: CLOSED_MARKER.to_string(),
    });
}

struct Harness {
    url: String,
    connections: Arc<AtomicUsize>,
    received: mpsc::UnboundedReceiver<Received>,
}

impl Harness {
    async fn next_received(&mut self) -> Received {
        timeout(WAIT, self.received.recv())
            .await
            .expect("room should receive a frame")
            .expect("room should still be running")
    }
}

/// Spawn a mock room that sends `script` to every client that joins.
async fn spawn_room(script: Vec<Value>, close_after_script: bool) -> Harness {
    let (tx, rx) = mpsc::unbounded_channel();
    let connections = Arc::new(AtomicUsize::new(0));
    let mock = MockRoom {
        script: Arc::new(script.into_iter().map(|frame| frame.to_string()).collect()),
        close_after_script,
        connections: connections.clone(),
        received: tx,
    };

    let app = Router::new()
        .route("/ws/{room}/{name}", get(ws_handler))
        .with_state(mock);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Harness {
        url: format!("ws://{addr}"),
        connections,
        received: rx,
    }
}

// ============================================================================
// Frames
// ============================================================================

fn player(name: &str, value: u8, stand: bool) -> Value {
    json!({
        "name": name,
        "hand": [{"rank": "9", "suit": "Clubs"}, {"rank": "3", "suit": "Hearts"}],
        "value": value,
        "stand": stand,
        "bust": false,
        "is_bot": name.starts_with("Bot"),
    })
}

fn lobby_frame(names: &[&str]) -> Value {
    json!({
        "type": "state",
        "state": {
            "players": names.iter().map(|name| player(name, 0, false)).collect::<Vec<_>>(),
            "dealer": {"name": "Dealer", "hand": [], "value": 0, "stand": false, "bust": false, "is_bot": false},
            "turn": null,
            "started": false,
            "over": false,
        }
    })
}

fn dealt_frame(turn: &str) -> Value {
    json!({
        "type": "state",
        "state": {
            "players": [player("alice", 12, false), player("Bot1", 15, false)],
            "dealer": {
                "name": "Dealer",
                "hand": [{"rank": "Hidden", "suit": "Hidden"}, {"rank": "K", "suit": "Spades"}],
                "value": "?",
                "stand": false,
                "bust": false,
                "is_bot": false,
            },
            "turn": turn,
            "started": true,
            "over": false,
        }
    })
}

/// Terminal input the test types into line by line.
struct Keyboard {
    keys: std_mpsc::Receiver<Vec<u8>>,
    current: io::Cursor<Vec<u8>>,
}

impl Read for Keyboard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.current.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            match self.keys.recv() {
                Ok(chunk) => self.current = io::Cursor::new(chunk),
                Err(_) => return Ok(0),
            }
        }
    }
}

fn keyboard() -> (std_mpsc::Sender<Vec<u8>>, InputLines) {
    let (tx, keys) = std_mpsc::channel();
    let reader = BufReader::new(Keyboard {
        keys,
        current: io::Cursor::new(Vec::new()),
    });
    (tx, InputLines::from_reader(reader).unwrap())
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("an event should arrive")
        .expect("event channel should be open")
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_join_receives_snapshot() {
    let harness = spawn_room(vec![lobby_frame(&["alice"])], false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();

    let (connection, mut events) = Connection::open(&harness.url, &target).await.unwrap();
    assert!(connection.is_open());

    let ConnectionEvent::Snapshot(snapshot) = next_event(&mut events).await else {
        panic!("expected a snapshot");
    };
    assert_eq!(snapshot.phase, Phase::NotStarted);
    assert_eq!(snapshot.players[0].id.as_str(), "alice");
}

#[tokio::test]
async fn test_room_and_name_address_the_socket() {
    let mut harness = spawn_room(vec![], false).await;
    let target = JoinTarget::new("Mary Jane", "high rollers").unwrap();

    let (connection, _events) = Connection::open(&harness.url, &target).await.unwrap();
    connection.send_intent(ClientAction::AddBot);

    let received = harness.next_received().await;
    assert_eq!(received.room, "high rollers");
    assert_eq!(received.name, "Mary Jane");
}

#[tokio::test]
async fn test_intents_use_wire_shape() {
    let mut harness = spawn_room(vec![], false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (connection, _events) = Connection::open(&harness.url, &target).await.unwrap();

    for action in [
        ClientAction::AddBot,
        ClientAction::Start,
        ClientAction::Hit,
        ClientAction::Stand,
    ] {
        connection.send_intent(action);
    }

    let mut frames = Vec::new();
    for _ in 0..4 {
        frames.push(harness.next_received().await.text);
    }
    assert_eq!(
        frames,
        vec![
            r#"{"action":"add_bot"}"#,
            r#"{"action":"start"}"#,
            r#"{"action":"hit"}"#,
            r#"{"action":"stand"}"#,
        ]
    );
}

#[tokio::test]
async fn test_unrecognized_frames_are_ignored() {
    let script = vec![
        lobby_frame(&["alice"]),
        json!({"type": "chat", "text": "hello"}),
        json!({"type": "state", "state": {"started": "soon"}}),
        json!("just a string"),
        dealt_frame("alice"),
    ];
    let harness = spawn_room(script, false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (_connection, mut events) = Connection::open(&harness.url, &target).await.unwrap();

    let ConnectionEvent::Snapshot(first) = next_event(&mut events).await else {
        panic!("expected a snapshot");
    };
    let ConnectionEvent::Snapshot(second) = next_event(&mut events).await else {
        panic!("expected a snapshot");
    };
    assert_eq!(first.phase, Phase::NotStarted);
    assert!(matches!(second.phase, Phase::InProgress { .. }));
}

#[tokio::test]
async fn test_server_close_is_reported_once() {
    let harness = spawn_room(vec![lobby_frame(&["alice"])], true).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (connection, mut events) = Connection::open(&harness.url, &target).await.unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Snapshot(_)
    ));
    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Closed(_)
    ));
    assert!(!connection.is_open());

    // Sending after closure is a silent no-op.
    connection.send_intent(ClientAction::Hit);
}

#[tokio::test]
async fn test_close_turns_sends_into_noops() {
    let mut harness = spawn_room(vec![], false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (connection, mut events) = Connection::open(&harness.url, &target).await.unwrap();

    connection.close();
    connection.close();
    assert!(!connection.is_open());
    connection.send_intent(ClientAction::Start);

    // The room sees the socket close without any action frame first.
    assert_eq!(harness.next_received().await.text, CLOSED_MARKER);

    // A locally requested close is not reported as an event.
    let next = timeout(WAIT, events.recv()).await.expect("channel should close");
    assert!(next.is_none());
}

#[tokio::test]
async fn test_connection_refused() {
    let target = JoinTarget::new("alice", "room1").unwrap();
    let result = Connection::open("ws://127.0.0.1:1", &target).await;
    assert!(matches!(result, Err(ConnectionError::Connect { .. })));
}

#[tokio::test]
async fn test_empty_input_never_connects() {
    let harness = spawn_room(vec![lobby_frame(&["alice"])], false).await;

    assert_eq!(JoinTarget::new("", "room1"), Err(JoinError::MissingName));
    assert_eq!(JoinTarget::new("alice", "  "), Err(JoinError::MissingRoom));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.connections.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_session_gates_actions_on_affordances() {
    let mut harness = spawn_room(vec![lobby_frame(&["alice"]), dealt_frame("Bot1")], false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (mut session, mut events) = Session::join(&harness.url, target).await.unwrap();

    assert_eq!(
        session.handle(next_event(&mut events).await),
        SessionUpdate::Rendered
    );
    assert_eq!(
        session.state(),
        &SessionState::InRoom {
            phase: Phase::NotStarted
        }
    );
    assert!(!session.request(ClientAction::Hit));
    assert!(session.request(ClientAction::Start));
    assert_eq!(
        harness.next_received().await.text,
        r#"{"action":"start"}"#
    );

    // Someone else's turn: hit and stand stay hidden.
    assert_eq!(
        session.handle(next_event(&mut events).await),
        SessionUpdate::Rendered
    );
    assert!(!session.request(ClientAction::Hit));
    assert!(!session.request(ClientAction::Stand));
    assert!(!session.request(ClientAction::Start));
    assert!(session.request(ClientAction::AddBot));
    assert_eq!(
        harness.next_received().await.text,
        r#"{"action":"add_bot"}"#
    );
}

#[tokio::test]
async fn test_session_my_turn_enables_hit() {
    let mut harness = spawn_room(vec![dealt_frame("alice")], false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (mut session, mut events) = Session::join(&harness.url, target).await.unwrap();

    session.handle(next_event(&mut events).await);
    assert!(session.request(ClientAction::Hit));
    assert_eq!(harness.next_received().await.text, r#"{"action":"hit"}"#);
}

#[tokio::test]
async fn test_session_close_discards_state() {
    let harness = spawn_room(vec![dealt_frame("alice")], true).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (mut session, mut events) = Session::join(&harness.url, target).await.unwrap();

    session.handle(next_event(&mut events).await);
    assert!(session.room().snapshot().is_some());

    let update = session.handle(next_event(&mut events).await);
    assert!(matches!(update, SessionUpdate::Ended(_)));
    assert_eq!(session.state(), &SessionState::Disconnected);
    assert!(session.room().snapshot().is_none());
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_session_leave() {
    let mut harness = spawn_room(vec![lobby_frame(&["alice"])], false).await;
    let target = JoinTarget::new("alice", "room1").unwrap();
    let (mut session, mut events) = Session::join(&harness.url, target).await.unwrap();
    session.handle(next_event(&mut events).await);

    session.leave();
    assert_eq!(session.state(), &SessionState::Disconnected);
    assert!(session.room().model().is_none());
    assert!(!session.is_connected());
    assert!(!session.request(ClientAction::AddBot));
    assert_eq!(harness.next_received().await.text, CLOSED_MARKER);
}

#[tokio::test]
async fn test_failed_connect_returns_to_disconnected() {
    let mut session = Session::new(JoinTarget::new("alice", "room1").unwrap());
    assert_eq!(session.state(), &SessionState::Disconnected);

    let result = session.connect("ws://127.0.0.1:1").await;
    assert!(matches!(result, Err(ConnectionError::Connect { .. })));
    assert_eq!(session.state(), &SessionState::Disconnected);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_rejoin_after_failed_connect() {
    let harness = spawn_room(vec![lobby_frame(&["alice"])], false).await;
    let mut session = Session::new(JoinTarget::new("alice", "room1").unwrap());
    assert!(session.connect("ws://127.0.0.1:1").await.is_err());

    let mut events = session.connect(&harness.url).await.unwrap();
    assert_eq!(
        session.state(),
        &SessionState::InRoom {
            phase: Phase::NotStarted
        }
    );
    assert_eq!(
        session.handle(next_event(&mut events).await),
        SessionUpdate::Rendered
    );
    assert_eq!(harness.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_text_client_keeps_input_after_server_close() {
    let harness = spawn_room(vec![lobby_frame(&["alice"])], true).await;
    let target = JoinTarget::new("alice", "r1").unwrap();
    let (mut session, mut events) = Session::join(&harness.url, target).await.unwrap();
    let (keys, mut input) = keyboard();

    // The room closes while the text client waits for a command.
    let end = timeout(WAIT, text_client::run(&mut session, &mut events, &mut input))
        .await
        .expect("session should end")
        .unwrap();
    assert!(matches!(end, SessionEnd::Closed(_)));

    // Back in the lobby, the next lines typed answer the prompts.
    keys.send(b"bob\n".to_vec()).unwrap();
    keys.send(b"r2\n".to_vec()).unwrap();
    for expected in ["bob", "r2"] {
        let line = timeout(WAIT, input.next_line()).await.unwrap().unwrap();
        assert_eq!(line.as_deref(), Some(expected));
    }
}
