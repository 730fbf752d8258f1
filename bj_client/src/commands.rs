use blackjack::ClientAction;
use std::fmt;

pub const HELP: &str = "\
bot
        Add a bot player to the room.
start
        Deal a new hand. Available before the first hand and once a hand is over.
hit
        Take another card. Only available on your turn.
stand
        Keep your hand and pass the turn. Only available on your turn.
leave
        Leave the room and return to the lobby.
quit
        Leave the room and exit.
";

/// Commands a user can type while in a room.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserCommand {
    Intent(ClientAction),
    Leave,
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace was entered.
    Empty,
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Enter a command. Type 'help' to see available commands"),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a command string into a UserCommand.
///
/// # Examples
///
/// ```
/// use bj_client::commands::{UserCommand, parse_command};
/// use blackjack::ClientAction;
///
/// assert_eq!(parse_command("hit"), Ok(UserCommand::Intent(ClientAction::Hit)));
/// assert_eq!(parse_command(" Stand "), Ok(UserCommand::Intent(ClientAction::Stand)));
/// assert_eq!(parse_command("leave"), Ok(UserCommand::Leave));
/// ```
pub fn parse_command(input: &str) -> Result<UserCommand, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    match trimmed.to_lowercase().as_str() {
        "bot" | "add-bot" | "add_bot" => Ok(UserCommand::Intent(ClientAction::AddBot)),
        "start" => Ok(UserCommand::Intent(ClientAction::Start)),
        "hit" => Ok(UserCommand::Intent(ClientAction::Hit)),
        "stand" => Ok(UserCommand::Intent(ClientAction::Stand)),
        "leave" | "back" => Ok(UserCommand::Leave),
        "help" | "?" => Ok(UserCommand::Help),
        "quit" | "exit" => Ok(UserCommand::Quit),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}
