//! Plain text client for terminals without TUI support.
//!
//! Prints the table after every snapshot and reads commands line by line
//! from stdin.

use anyhow::{Context, Result};
use blackjack::{Notice, RenderModel};
use tokio::sync::mpsc;

use crate::{
    commands::{HELP, UserCommand, parse_command},
    connection::{CloseReason, ConnectionEvent},
    input::InputLines,
    session::{Session, SessionEnd, SessionUpdate},
};

/// Run a session until the user leaves or the connection closes.
pub async fn run(
    session: &mut Session,
    events: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
    input: &mut InputLines,
) -> Result<SessionEnd> {
    println!(
        "Connected to room {} as {}. Type 'help' for commands.\n",
        session.target().room(),
        session.target().name()
    );

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(SessionEnd::Closed(CloseReason::ServerClosed));
                };
                match session.handle(event) {
                    SessionUpdate::Rendered => {
                        if let Some(model) = session.room().model() {
                            println!("{}", render(model, session.target().room()));
                        }
                    }
                    SessionUpdate::Ended(reason) => return Ok(SessionEnd::Closed(reason)),
                }
            }
            line = input.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    // EOF
                    return Ok(SessionEnd::Quit);
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(UserCommand::Intent(action)) => {
                        if !session.request(action) {
                            eprintln!("'{action}' is not available right now");
                        }
                    }
                    Ok(UserCommand::Leave) => return Ok(SessionEnd::Left),
                    Ok(UserCommand::Quit) => return Ok(SessionEnd::Quit),
                    Ok(UserCommand::Help) => println!("\n{HELP}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
    }
}

/// Render a model as a block of text.
pub fn render(model: &RenderModel, room: &str) -> String {
    let mut out = Vec::new();

    out.push("═".repeat(60));
    out.push(format!("BLACKJACK  room: {room}"));
    out.push("═".repeat(60));

    let dealer = &model.dealer;
    out.push(format!("{} Dealer", dealer.avatar));
    out.push(format!("   {}", dealer.cards_repr()));
    if let Some(score) = dealer.score {
        out.push(format!("   Score: {score}"));
    }
    out.push("─".repeat(60));

    if model.players.is_empty() {
        out.push("No players in room".to_string());
    }
    for player in &model.players {
        let turn_mark = if player.is_turn { "👉 " } else { "" };
        let you_mark = if player.is_local { " (you)" } else { "" };
        let bot_mark = if player.is_bot { " 🤖" } else { "" };
        let bust_mark = if player.hand.bust { " 💥" } else { "" };
        let stand_mark = if player.stand { " 🛑" } else { "" };
        out.push(format!(
            "{turn_mark}{} {}{you_mark}{bot_mark}{bust_mark}{stand_mark}",
            player.hand.avatar, player.id
        ));
        out.push(format!("   {}", player.hand.cards_repr()));
        if let Some(score) = player.hand.score {
            out.push(format!("   Score: {score}"));
        }
    }

    out.push("─".repeat(60));
    match &model.notice {
        Notice::Waiting => out.push(Notice::WAITING_TEXT.to_string()),
        Notice::Results(resolution) => {
            out.push("Game Over!".to_string());
            out.extend(resolution.outcomes.iter().map(ToString::to_string));
            if let Some(winner) = &resolution.celebrated {
                out.push(format!("🎊🎉🎊 {winner} takes the table! 🎊🎉🎊"));
            }
        }
        Notice::None => {}
    }

    let controls: Vec<_> = model
        .affordances
        .enabled()
        .iter()
        .map(ToString::to_string)
        .collect();
    out.push(format!("Commands: {}, leave, quit", controls.join(", ")));
    out.push("═".repeat(60));

    out.join("\n")
}
