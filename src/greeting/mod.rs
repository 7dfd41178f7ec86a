//! The greeting core: intent detection, the staged state machine, and reply
//! selection. Everything in this module is pure; persistence and sending
//! stay in the bot layer.

/// The staged greeting state machine.
pub mod engine;
/// Bounded reply pools with round-robin and random selection.
pub mod pool;
/// Per-user persisted greeting state.
pub mod record;
/// Loading of the canned reply pools.
pub mod replies;

pub use engine::{Decision, GreetingEngine};
pub use pool::ResponsePool;
pub use record::{GreetingRecord, Stage};
pub use replies::ReplySet;

/// Token in fresh-pool entries replaced with the author's display name
/// before sending.
pub const NAME_TOKEN: &str = "{user}";

/// Substitutes the address-by-name token with the user's display name.
/// Replies without the token pass through unchanged.
#[must_use]
pub fn personalize(reply: &str, user_name: &str) -> String {
    reply.replace(NAME_TOKEN, user_name)
}
