//! Telegram-facing layer: update handlers, per-user locking, resilient sends.

/// Message handlers bridging updates to the greeting engine
pub mod handlers;
/// Resilient send wrappers with retry
pub mod resilient;
/// Per-user serialization of message handling
pub mod user_locks;

pub use user_locks::UserLocks;
