//! Relay Service Library
//!
//! Exposes configuration, the chat command interpreter and the inbound update
//! loop so they can be tested without starting the binary.

pub mod bot;
pub mod commands;
pub mod config;

pub use bot::run_command_loop;
pub use commands::{Command, CommandHandler};
pub use config::Config;
