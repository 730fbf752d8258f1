//! Internal modules for the blackjack client.
//!
//! This library provides the room connection, the per-join session, command
//! parsing, configuration and both user interfaces used by the bj_client
//! binary.

pub mod commands;
pub mod config;
pub mod connection;
pub mod facts;
pub mod input;
pub mod logging;
pub mod session;
pub mod text_client;
pub mod tui_app;
