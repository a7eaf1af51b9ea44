//! ChessRelay Core - live-game relay for a team chess bot.
//!
//! This crate provides:
//! - The relay engine: roster sync, status polling, notification dedup and
//!   subscriber fan-out with a priority maintenance broadcast
//! - Lichess and Telegram API clients
//! - Circuit breaker for upstream API resilience
//! - Postgres-backed subscriber directory

pub mod circuit_breaker;
pub mod clients;
pub mod db;
pub mod error;
pub mod models;
pub mod relay;

pub use error::{RelayError, RelayResult};
