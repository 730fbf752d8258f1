//! TUI application for the blackjack client.
//!
//! This module provides a terminal UI using ratatui. It drains connection
//! events in arrival order between key presses and redraws the table from
//! the session's current render model.

use anyhow::Result;
use blackjack::{Card, HandModel, Notice, ParticipantId, Phase, PlayerModel, RenderModel, Suit};
use chrono::{DateTime, Utc};
use rand::Rng;
use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    layout::{Alignment, Constraint, Flex, Layout, Margin, Position, Rect},
    style::{Color, Style, Stylize},
    symbols::scrollbar,
    text::{Line, Span, Text},
    widgets::{
        Block, Cell, Clear, List, ListDirection, ListItem, Padding, Paragraph, Row, Scrollbar,
        ScrollbarOrientation, Table,
    },
};
use std::{
    mem,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{
    commands::{HELP, UserCommand, parse_command},
    connection::{CloseReason, ConnectionEvent},
    session::{Session, SessionEnd, SessionUpdate},
};

mod widgets;

use widgets::{ScrollableList, UserInput};

const MAX_LOG_RECORDS: usize = 1024;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const CONFETTI_DURATION: Duration = Duration::from_secs(2);
const CONFETTI_PIECES: usize = 30;

/// Whether `next` starts a new phase. Turn changes within a hand don't count.
fn entered_phase(last: Option<&Phase>, next: &Phase) -> bool {
    last.is_none_or(|last| mem::discriminant(last) != mem::discriminant(next))
}

fn make_card_span(card: &Card) -> Span<'static> {
    let repr = card.to_string();
    match card {
        Card::Hidden => Span::styled(repr, Style::default().light_magenta()),
        Card::Face { suit, .. } => match suit {
            Suit::Clubs => Span::styled(repr, Style::default().light_green()),
            Suit::Diamonds => Span::styled(repr, Style::default().light_blue()),
            Suit::Hearts => Span::styled(repr, Style::default().light_red()),
            Suit::Spades => Span::raw(repr),
        },
    }
}

fn make_hand_line(hand: &HandModel) -> Line<'static> {
    Line::from(
        hand.cards
            .iter()
            .flat_map(|card| [make_card_span(card), " ".into()])
            .collect::<Vec<_>>(),
    )
}

fn make_score_repr(hand: &HandModel) -> String {
    hand.score
        .map_or_else(String::new, |score| format!("Score: {score}"))
}

fn make_player_row(player: &PlayerModel) -> Row<'static> {
    let turn_repr = if player.is_turn { "👉" } else { "" };
    let mut flags = String::new();
    if player.is_bot {
        flags.push('🤖');
    }
    if player.hand.bust {
        flags.push('💥');
    }
    if player.stand {
        flags.push('🛑');
    }

    let mut row = Row::new(vec![
        Cell::new(Text::from(turn_repr).alignment(Alignment::Center)),
        Cell::new(
            Text::from(format!("{} {}", player.hand.avatar, player.id)).alignment(Alignment::Left),
        ),
        Cell::new(Text::from(flags).alignment(Alignment::Left)),
        Cell::new(Text::from(make_hand_line(&player.hand)).alignment(Alignment::Left)),
        Cell::new(Text::from(make_score_repr(&player.hand)).alignment(Alignment::Right)),
    ]);

    if player.is_local {
        row = row.bold().white();
    }
    row
}

#[derive(Clone)]
enum RecordKind {
    Alert,
    Error,
    Game,
    You,
}

#[derive(Clone, Copy, PartialEq)]
enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A timestamped terminal message with an importance label to help
/// direct user attention.
#[derive(Clone)]
struct Record {
    datetime: DateTime<Utc>,
    kind: RecordKind,
    content: String,
}

impl Record {
    fn new(kind: RecordKind, content: String) -> Self {
        Self {
            datetime: Utc::now(),
            kind,
            content,
        }
    }
}

impl From<Record> for ListItem<'_> {
    fn from(val: Record) -> Self {
        let repr = match val.kind {
            RecordKind::Alert => "ALERT".light_magenta(),
            RecordKind::Error => "ERROR".light_red(),
            RecordKind::Game => "GAME".light_yellow(),
            RecordKind::You => "YOU".light_green(),
        };

        let msg = vec![
            format!("[{} ", val.datetime.format("%H:%M:%S")).into(),
            Span::styled(format!("{repr:5}"), repr.style),
            format!("]: {}", val.content).into(),
        ];

        ListItem::new(Line::from(msg))
    }
}

/// Short-lived burst of coloured pieces shown when a hand has a winner.
struct Confetti {
    t: Instant,
    /// Column as a percentage of the width, and colour.
    pieces: Vec<(u16, Color)>,
}

impl Confetti {
    fn new() -> Self {
        let mut rng = rand::rng();
        let pieces = (0..CONFETTI_PIECES)
            .map(|_| {
                (
                    rng.random_range(0..100),
                    Color::Indexed(rng.random_range(16..232)),
                )
            })
            .collect();
        Self {
            t: Instant::now(),
            pieces,
        }
    }

    fn is_active(&self) -> bool {
        self.t.elapsed() < CONFETTI_DURATION
    }

    fn line(&self, width: u16) -> Line<'static> {
        let mut cells: Vec<Span<'static>> = vec![" ".into(); width as usize];
        for (pct, color) in &self.pieces {
            let x = (*pct as usize * width as usize) / 100;
            if let Some(cell) = cells.get_mut(x) {
                *cell = Span::styled("*", Style::default().fg(*color));
            }
        }
        Line::from(cells)
    }
}

/// TUI App state
pub struct TuiApp {
    username: ParticipantId,
    room: String,
    /// Whether to display the help menu window
    show_help_menu: bool,
    /// Helps scroll through the help menu window if the terminal is small
    help_handle: ScrollableList,
    /// History of recorded messages
    log_handle: ScrollableList,
    /// Current value of the input box
    user_input: UserInput,
    connection_status: ConnectionStatus,
    /// Phase of the last drawn snapshot, to report transitions once
    last_phase: Option<Phase>,
    my_turn: bool,
    confetti: Option<Confetti>,
}

impl TuiApp {
    pub fn new(username: ParticipantId, room: String) -> Self {
        let mut help_handle = ScrollableList::new(MAX_LOG_RECORDS);
        help_handle.push("".into());
        for line in HELP.lines() {
            help_handle.push(line.into());
        }
        help_handle.push("".into());
        help_handle.jump_to_first();

        Self {
            username,
            room,
            show_help_menu: false,
            help_handle,
            log_handle: ScrollableList::new(MAX_LOG_RECORDS),
            user_input: UserInput::new(),
            connection_status: ConnectionStatus::Connected,
            last_phase: None,
            my_turn: false,
            confetti: None,
        }
    }

    fn add_log(&mut self, kind: RecordKind, content: String) {
        let record = Record::new(kind, content);
        self.log_handle.push(record.into());
    }

    /// Handle user input. Returns how the session ends, if it does.
    fn handle_command(&mut self, user_input: &str, session: &Session) -> Option<SessionEnd> {
        if user_input.trim().is_empty() {
            return None;
        }
        match parse_command(user_input) {
            Ok(UserCommand::Intent(action)) => {
                if session.request(action) {
                    self.add_log(RecordKind::You, user_input.trim().to_string());
                } else {
                    self.add_log(
                        RecordKind::Error,
                        format!("'{action}' is not available right now"),
                    );
                }
            }
            Ok(UserCommand::Help) => self.show_help_menu = !self.show_help_menu,
            Ok(UserCommand::Leave) => return Some(SessionEnd::Left),
            Ok(UserCommand::Quit) => return Some(SessionEnd::Quit),
            Err(e) => self.add_log(RecordKind::Error, e.to_string()),
        }
        None
    }

    /// Record what changed with the newest render model.
    fn on_model(&mut self, model: &RenderModel) {
        if entered_phase(self.last_phase.as_ref(), &model.phase) {
            match &model.notice {
                Notice::Waiting => {
                    self.add_log(RecordKind::Game, Notice::WAITING_TEXT.to_string())
                }
                Notice::Results(resolution) => {
                    self.add_log(RecordKind::Game, "Game Over!".to_string());
                    for outcome in &resolution.outcomes {
                        self.add_log(RecordKind::Game, outcome.to_string());
                    }
                    if resolution.celebrated.is_some() {
                        self.confetti = Some(Confetti::new());
                    }
                }
                Notice::None => self.add_log(RecordKind::Game, "Cards dealt".to_string()),
            }
        }
        self.last_phase = Some(model.phase.clone());

        if model.affordances.hit && !self.my_turn {
            self.add_log(RecordKind::Alert, "It's your turn!".to_string());
        }
        self.my_turn = model.affordances.hit;
    }

    fn draw_confetti(&mut self, frame: &mut Frame, area: Rect) {
        if self.confetti.as_ref().is_some_and(|c| !c.is_active()) {
            self.confetti = None;
        }
        if let Some(confetti) = &self.confetti {
            frame.render_widget(Paragraph::new(confetti.line(area.width)), area);
        }
    }

    /// Render the dealer and the players
    fn draw_table(&self, frame: &mut Frame, area: Rect, model: Option<&RenderModel>) {
        let notice = match model.map(|model| &model.notice) {
            Some(Notice::Waiting) => format!(" {}  ", Notice::WAITING_TEXT),
            Some(Notice::Results(_)) => " Game Over!  ".to_string(),
            _ => String::new(),
        };
        let table_block = Block::bordered()
            .padding(Padding::horizontal(1))
            .title(format!(" room: {}  ", self.room))
            .title_bottom(notice);
        let inner = table_block.inner(area);
        frame.render_widget(table_block, area);

        let Some(model) = model else {
            frame.render_widget(Paragraph::new("Waiting for the table..."), inner);
            return;
        };

        let [dealer_area, players_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(inner);

        let dealer = Paragraph::new(vec![
            Line::from(format!(
                "{} Dealer  {}",
                model.dealer.avatar,
                make_score_repr(&model.dealer)
            ))
            .bold(),
            make_hand_line(&model.dealer),
        ]);
        frame.render_widget(dealer, dealer_area);

        let players = Table::new(
            model.players.iter().map(make_player_row),
            [
                Constraint::Max(3),
                Constraint::Fill(2),
                Constraint::Max(8),
                Constraint::Fill(3),
                Constraint::Fill(1),
            ],
        );
        frame.render_widget(players, players_area);
    }

    /// Render the log/history window with scrollbar
    fn draw_log(&mut self, frame: &mut Frame, area: Rect) {
        let log_records = self.log_handle.list_items.clone();
        let log_records = List::new(log_records)
            .direction(ListDirection::BottomToTop)
            .block(Block::bordered().title(" history  "));
        frame.render_stateful_widget(log_records, area, &mut self.log_handle.list_state);

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .begin_symbol(None)
                .end_symbol(None),
            area.inner(Margin {
                vertical: 1,
                horizontal: 1,
            }),
            &mut self.log_handle.scroll_state,
        );
    }

    /// Render the user input area
    fn draw_user_input(&self, frame: &mut Frame, area: Rect) {
        let user_input = Paragraph::new(self.user_input.value.as_str())
            .style(Style::default())
            .block(
                Block::bordered()
                    .title(format!(" {}@{}  ", self.username, self.room).light_green()),
            );
        frame.render_widget(user_input, area);
        frame.set_cursor_position(Position::new(
            area.x + self.user_input.char_idx as u16 + 1,
            area.y + 1,
        ));
    }

    /// Render the status bar with the controls currently offered
    fn draw_help_bar(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let status_indicator = match self.connection_status {
            ConnectionStatus::Connected => "● Connected".green(),
            ConnectionStatus::Disconnected => "● Disconnected".red(),
        };

        let controls = session
            .room()
            .affordances()
            .enabled()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" · ");

        let help_message = vec![
            status_indicator,
            " | ".into(),
            controls.bold().white(),
            " | press ".into(),
            "Tab".bold().white(),
            " for help, or ".into(),
            "Esc".bold().white(),
            " to leave".into(),
        ];
        frame.render_widget(Paragraph::new(Line::from(help_message)), area);
    }

    /// Render the help menu overlay
    fn draw_help_menu(&mut self, frame: &mut Frame) {
        let vertical = Layout::vertical([Constraint::Max(18)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Max(92)]).flex(Flex::Center);
        let [help_menu_area] = vertical.areas(frame.area());
        let [help_menu_area] = horizontal.areas(help_menu_area);
        frame.render_widget(Clear, help_menu_area);

        let help_items = self.help_handle.list_items.clone();
        let help_items = List::new(help_items)
            .direction(ListDirection::BottomToTop)
            .block(Block::bordered().title(" commands  "));
        frame.render_stateful_widget(
            help_items,
            help_menu_area,
            &mut self.help_handle.list_state,
        );

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .begin_symbol(None)
                .end_symbol(None),
            help_menu_area.inner(Margin {
                vertical: 1,
                horizontal: 1,
            }),
            &mut self.help_handle.scroll_state,
        );
    }

    /// Main draw function - orchestrates rendering of all UI components
    fn draw(&mut self, frame: &mut Frame, session: &Session) {
        let window = Layout::vertical([
            Constraint::Length(1), // Confetti
            Constraint::Min(8),    // Table + log
            Constraint::Length(3), // User input area
            Constraint::Length(1), // Help bar
        ]);
        let [confetti_area, top_area, user_input_area, help_area] = window.areas(frame.area());

        let [table_area, log_area] =
            Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)])
                .areas(top_area);

        self.draw_confetti(frame, confetti_area);
        self.draw_table(frame, table_area, session.room().model());
        self.draw_log(frame, log_area);
        self.draw_user_input(frame, user_input_area);
        self.draw_help_bar(frame, help_area, session);

        if self.show_help_menu {
            self.draw_help_menu(frame);
        }
    }

    /// Run the TUI until the user leaves or the connection closes
    pub async fn run(
        mut self,
        session: &mut Session,
        events: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
        mut terminal: DefaultTerminal,
    ) -> Result<SessionEnd> {
        loop {
            terminal.draw(|frame| self.draw(frame, session))?;

            if event::poll(POLL_TIMEOUT)?
                && let Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind,
                    ..
                }) = event::read()?
                && kind == KeyEventKind::Press
            {
                match modifiers {
                    KeyModifiers::CONTROL => match code {
                        KeyCode::Home => self.log_handle.jump_to_first(),
                        KeyCode::End => self.log_handle.jump_to_last(),
                        KeyCode::Char('c') => return Ok(SessionEnd::Quit),
                        _ => {}
                    },
                    KeyModifiers::NONE | KeyModifiers::SHIFT => match code {
                        KeyCode::Enter => {
                            let user_input = self.user_input.submit();
                            if let Some(end) = self.handle_command(&user_input, session) {
                                return Ok(end);
                            }
                        }
                        KeyCode::Char(to_insert) => self.user_input.input(to_insert),
                        KeyCode::Backspace => self.user_input.backspace(),
                        KeyCode::Delete => self.user_input.delete(),
                        KeyCode::Left => self.user_input.move_left(),
                        KeyCode::Right => self.user_input.move_right(),
                        KeyCode::Up => {
                            if self.show_help_menu {
                                self.help_handle.move_up();
                            } else {
                                self.log_handle.move_up();
                            }
                        }
                        KeyCode::Down => {
                            if self.show_help_menu {
                                self.help_handle.move_down();
                            } else {
                                self.log_handle.move_down();
                            }
                        }
                        KeyCode::Home => self.user_input.jump_to_first(),
                        KeyCode::End => self.user_input.jump_to_last(),
                        KeyCode::Tab => self.show_help_menu = !self.show_help_menu,
                        KeyCode::Esc => return Ok(SessionEnd::Left),
                        _ => {}
                    },
                    _ => {}
                }
            }

            // Drain everything that arrived, oldest first
            loop {
                let event = match events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        ConnectionEvent::Closed(CloseReason::ServerClosed)
                    }
                };
                match session.handle(event) {
                    SessionUpdate::Rendered => {
                        if let Some(model) = session.room().model() {
                            self.on_model(model);
                        }
                    }
                    SessionUpdate::Ended(reason) => {
                        self.connection_status = ConnectionStatus::Disconnected;
                        self.add_log(RecordKind::Error, format!("Disconnected: {reason}"));
                        terminal.draw(|frame| self.draw(frame, session))?;
                        tokio::time::sleep(Duration::from_secs(2)).await;
                        return Ok(SessionEnd::Closed(reason));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackjack::{
        Avatar, HandValue, HandView, ParticipantId, PlayerView, Rank, Snapshot, reduce,
    };

    fn in_progress(turn: &str) -> RenderModel {
        let players = ["alice", "bob"]
            .into_iter()
            .map(|name| PlayerView {
                id: ParticipantId::new(name),
                hand: HandView {
                    hand: vec![Card::Hidden],
                    value: HandValue::Known(12),
                    bust: false,
                },
                is_bot: false,
                stand: false,
            })
            .collect();
        let snapshot = Snapshot::new(
            Phase::InProgress {
                turn: Some(ParticipantId::new(turn)),
            },
            HandView {
                hand: vec![Card::Hidden],
                value: HandValue::Unknown,
                bust: false,
            },
            players,
        )
        .unwrap();
        reduce(&snapshot, &ParticipantId::new("alice"))
    }

    #[test]
    fn test_entered_phase_ignores_turn() {
        let alice = Phase::InProgress {
            turn: Some(ParticipantId::new("alice")),
        };
        let bob = Phase::InProgress {
            turn: Some(ParticipantId::new("bob")),
        };
        assert!(entered_phase(None, &alice));
        assert!(entered_phase(Some(&Phase::NotStarted), &alice));
        assert!(!entered_phase(Some(&alice), &bob));
        assert!(entered_phase(Some(&bob), &Phase::Over));
    }

    #[test]
    fn test_cards_dealt_logged_once_per_hand() {
        let mut app = TuiApp::new(ParticipantId::new("alice"), "r1".to_string());
        let start = app.log_handle.list_items.len();
        app.on_model(&in_progress("bob"));
        app.on_model(&in_progress("alice"));
        app.on_model(&in_progress("bob"));
        // "Cards dealt" plus one "It's your turn!" alert.
        assert_eq!(app.log_handle.list_items.len(), start + 2);
    }

    fn hand(cards: Vec<Card>, score: Option<u8>) -> HandModel {
        HandModel {
            avatar: Avatar::for_name("alice"),
            cards,
            score,
            bust: false,
        }
    }

    #[test]
    fn test_card_span_colours() {
        let heart = make_card_span(&Card::Face {
            rank: Rank::Queen,
            suit: Suit::Hearts,
        });
        assert_eq!(heart.content, "Q♥");
        assert_eq!(heart.style, Style::default().light_red());
        assert_eq!(make_card_span(&Card::Hidden).content, "🂠");
    }

    #[test]
    fn test_score_repr_hidden_when_unknown() {
        assert_eq!(make_score_repr(&hand(vec![], None)), "");
        assert_eq!(make_score_repr(&hand(vec![], Some(21))), "Score: 21");
    }

    #[test]
    fn test_hand_line_spacing() {
        let line = make_hand_line(&hand(vec![Card::Hidden, Card::Hidden], None));
        assert_eq!(line.spans.len(), 4);
    }

    #[test]
    fn test_confetti_line_fits_width() {
        let confetti = Confetti::new();
        assert!(confetti.is_active());
        assert_eq!(confetti.line(40).spans.len(), 40);
    }
}
