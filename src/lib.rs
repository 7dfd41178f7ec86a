#![deny(missing_docs)]
//! Fruit stand greeting bot for Telegram group chats.
//!
//! Watches a shared chat for "gm" greetings and answers each user through a
//! staged, once-per-day conversation: a warm opener for the first greeting of
//! the day, a short affirmation when the user greets the bot back by name, a
//! pointed remark for the third round, and silence after that until the
//! 24-hour window rolls over. Reply text is drawn from canned pools loaded at
//! startup; per-user state lives in a small SQLite table.

/// Telegram-facing layer: message handlers, per-user locks, resilient sends.
pub mod bot;
/// Configuration and settings management.
pub mod config;
/// The greeting state machine and its reply pools.
pub mod greeting;
/// Persistent per-user greeting state (SQLite).
pub mod storage;
/// Shared helpers for logging and retries.
pub mod utils;
