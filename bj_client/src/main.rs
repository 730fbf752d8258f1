//! A blackjack client TUI for a multiplayer blackjack server.
//!
//! The client asks for a name and a room, joins the room over a WebSocket,
//! and renders every table snapshot the server pushes. Leaving the room or
//! losing the connection returns to the lobby with nothing carried over.

use anyhow::Result;
use bj_client::{
    config::{ClientConfig, ConfigOverrides},
    connection::JoinTarget,
    facts,
    input::InputLines,
    logging,
    session::{Session, SessionEnd},
    text_client,
    tui_app::TuiApp,
};
use log::{error, info};
use pico_args::Arguments;
use std::io::{self, Write};

const HELP: &str = "\
Play blackjack with friends and bots

USAGE:
  bj_client [OPTIONS]

OPTIONS:
  --server URL          Server WebSocket URL  [default: env BJ_SERVER_URL or ws://127.0.0.1:8000]
  --name NAME           Name to join with     [default: env BJ_PLAYER_NAME or prompt]
  --room ROOM           Room to join          [default: env BJ_ROOM or prompt]
  --log-file PATH       Append log records to PATH  [default: env BJ_LOG_FILE]
  --tui                 Use TUI (Terminal UI) mode [default: false]

FLAGS:
  -h, --help            Print help information
";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = ConfigOverrides {
        server_url: pargs.opt_value_from_str("--server").ok().flatten(),
        player_name: pargs.opt_value_from_str("--name").ok().flatten(),
        room: pargs.opt_value_from_str("--room").ok().flatten(),
        log_file: pargs.opt_value_from_str("--log-file").ok().flatten(),
        use_tui: pargs.contains("--tui"),
    };

    let config = ClientConfig::from_env(overrides);
    config.validate()?;
    logging::init(config.log_file.as_deref(), config.use_tui)?;

    run(config).await
}

/// Print a prompt and read one trimmed line. `None` on end of input.
async fn prompt(input: &mut InputLines, label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let line = input.next_line().await?;
    Ok(line.map(|line| line.trim().to_string()))
}

/// Ask for a name and room until both are valid.
async fn prompt_target(
    input: &mut InputLines,
    mut name: Option<String>,
    mut room: Option<String>,
) -> Result<Option<JoinTarget>> {
    loop {
        let name_input = match name.take() {
            Some(name) => name,
            None => match prompt(input, "Your name: ").await? {
                Some(input) => input,
                None => return Ok(None),
            },
        };
        let room_input = match room.take() {
            Some(room) => room,
            None => match prompt(input, "Room ID: ").await? {
                Some(input) => input,
                None => return Ok(None),
            },
        };

        match JoinTarget::new(&name_input, &room_input) {
            Ok(target) => return Ok(Some(target)),
            Err(e) => println!("{e}"),
        }
    }
}

async fn run(config: ClientConfig) -> Result<()> {
    let mut name = config.player_name.clone();
    let mut room = config.room.clone();
    let mut input = InputLines::stdin()?;

    loop {
        println!("\n🃏 Blackjack  ({})", facts::random_fact());

        // Configured values are only used for the first join.
        let Some(target) = prompt_target(&mut input, name.take(), room.take()).await? else {
            break;
        };

        println!("Joining room {} as {}...", target.room(), target.name());
        let (mut session, mut events) = match Session::join(&config.server_url, target).await {
            Ok(joined) => joined,
            Err(e) => {
                error!("{e}");
                println!("{e}");
                continue;
            }
        };

        let end = if config.use_tui {
            let terminal = ratatui::init();
            let tui_app = TuiApp::new(
                session.target().name().clone(),
                session.target().room().to_string(),
            );
            let result = tui_app.run(&mut session, &mut events, terminal).await;
            ratatui::restore();
            result
        } else {
            text_client::run(&mut session, &mut events, &mut input).await
        };

        session.leave();
        drop(session);

        match end? {
            SessionEnd::Quit => break,
            SessionEnd::Left => println!("\nLeft the room."),
            SessionEnd::Closed(reason) => {
                info!("Session closed: {reason}");
                println!("\nDisconnected from server. ({reason})");
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
