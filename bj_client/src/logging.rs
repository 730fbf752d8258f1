//! Logging setup for the client.
//!
//! The terminal UI owns the screen, so records either go to a file or are
//! switched off entirely while it runs. The plain text client logs to
//! stderr. `RUST_LOG` filters in every mode.

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::{fs::OpenOptions, path::Path};

/// Initialize the global logger
pub fn init(log_file: Option<&Path>, use_tui: bool) -> Result<()> {
    let mut builder = builder(log_file, use_tui)?;
    builder.try_init().context("Failed to initialize logger")?;
    log::debug!("Logging initialized");
    Ok(())
}

fn builder(log_file: Option<&Path>, use_tui: bool) -> Result<Builder> {
    let default_filter = if log_file.is_some() { "info" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));
    builder.format_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None if use_tui => {
            builder.filter_level(LevelFilter::Off);
        }
        None => {
            builder.target(Target::Stderr);
        }
    }

    Ok(builder)
}
